//! # Example: Single publishers on an operation queue
//!
//! Runs three single-value publishers through a serial [`OperationQueue`] with the
//! built-in [`LogWriter`] attached:
//! - a checked publisher delivering its value;
//! - a checked publisher breaking its promise (two values);
//! - a publisher that never answers and is cancelled by dropping its handle.
//!
//! Run with: `cargo run --example queue --features logging`

use std::sync::Arc;
use std::time::Duration;

use streamtraits::{
    Completion, Executor, Just, LogWriter, Observe, OperationQueue, PublisherExt, QueueConfig,
    SinglePublisherExt, Subject,
};
use tokio::sync::oneshot;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(LogWriter::new())];
    let queue = OperationQueue::builder(QueueConfig::serial())
        .with_observers(observers)
        .build();
    let executor: Arc<dyn Executor> = queue.clone();

    // One value: delivered.
    let (tx, rx) = oneshot::channel();
    let _answer = Just::<u32, String>::new(42)
        .check_single()
        .in_operation_queue(Arc::clone(&executor))
        .sink_single(move |result| {
            let _ = tx.send(result);
        });
    println!("answer: {:?}", rx.await?);

    // Two values: the check fails the stream.
    let twice = Subject::<u32, String>::new();
    let (tx, rx) = oneshot::channel();
    let _twice = twice
        .clone()
        .check_single()
        .in_operation_queue(Arc::clone(&executor))
        .sink_single(move |result| {
            let _ = tx.send(result);
        });
    tokio::time::sleep(Duration::from_millis(50)).await;
    twice.send(1);
    twice.send(2);
    let err = rx.await?.err().map(|e| e.as_label());
    println!("twice: {err:?}");

    // No answer: dropping the handle cancels the queued operation.
    let silent = Subject::<u32, String>::new();
    let handle = silent
        .clone()
        .assert_single()
        .in_operation_queue(executor)
        .sink_single(|result| println!("silent: {result:?}"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(handle);
    silent.send_completion(Completion::Finished);

    tokio::time::sleep(Duration::from_millis(100)).await;
    queue.shutdown();
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
