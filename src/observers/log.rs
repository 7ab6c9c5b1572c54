//! # LogWriter: simple event printer
//!
//! A minimal observer that prints incoming [`Event`]s to stdout.
//! Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! [enqueued] op=fetch id=op-1
//! [starting] op=fetch id=op-1
//! [finished] op=fetch id=op-1
//! [cancelled] op=slow id=op-2 reason=cancelled by caller
//! [panicked] op=bad id=op-3 reason=boom
//! [queue-shutdown]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Event writer observer.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn line(e: &Event) -> String {
    let label = e.kind.as_label();
    if e.kind == EventKind::QueueShutdown {
        return format!("[{label}]");
    }

    let op = e.operation.as_deref().unwrap_or("unknown");
    let mut out = match e.id {
        Some(id) => format!("[{label}] op={op} id={id}"),
        None => format!("[{label}] op={op}"),
    };
    if let Some(reason) = e.reason.as_deref() {
        out.push_str(" reason=");
        out.push_str(reason);
    }
    out
}

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        println!("{}", line(e));
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::OperationId;

    #[test]
    fn formats_lines() {
        let ev = Event::new(EventKind::OperationCancelled)
            .with_operation("slow")
            .with_id(OperationId::new(2))
            .with_reason("shutdown");
        assert_eq!(line(&ev), "[cancelled] op=slow id=op-2 reason=shutdown");
        assert_eq!(line(&Event::new(EventKind::QueueShutdown)), "[queue-shutdown]");
    }
}
