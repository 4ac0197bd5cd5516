//! Generic batching stage
//!
//! A stage reads jobs from an input channel, accumulates them into a batch,
//! and hands the batch to its sink when the batch is full or a flush timer
//! expires. Jobs from a successfully processed batch are forwarded to the
//! stage's output channel in submission order, so stages can be chained.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

use super::PipelineError;

/// Consumer of one flushed batch
#[async_trait]
pub trait BatchSink<T>: Send + Sync {
    async fn process_batch(&self, batch: &[T]) -> Result<(), PipelineError>;
}

/// Spawn a batching stage around `sink`
///
/// The stage flushes when the batch reaches `batch_size` or when
/// `flush_interval` elapses, whichever comes first; the timer re-arms after
/// every flush. A failed flush is logged and the batch dropped, so one bad
/// batch never stalls the stage. On input-channel close or cancellation the
/// remaining batch is flushed best-effort without forwarding, and the output
/// channel closes with the stage.
pub fn spawn<T, S>(
    sink: Arc<S>,
    batch_size: usize,
    flush_interval: Duration,
    mut jobs: mpsc::Receiver<T>,
    mut shutdown: watch::Receiver<bool>,
) -> (mpsc::Receiver<T>, JoinHandle<()>)
where
    T: Send + 'static,
    S: BatchSink<T> + 'static,
{
    let (out_tx, out_rx) = mpsc::channel(batch_size.max(1));

    let handle = tokio::spawn(async move {
        let mut batch: Vec<T> = Vec::with_capacity(batch_size);
        let timer = sleep(flush_interval);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        flush_remainder(sink.as_ref(), &mut batch).await;
                        return;
                    }
                }
                maybe_job = jobs.recv() => {
                    match maybe_job {
                        Some(job) => {
                            batch.push(job);
                            if batch.len() >= batch_size {
                                flush_and_forward(sink.as_ref(), &mut batch, &out_tx).await;
                                timer.as_mut().reset(Instant::now() + flush_interval);
                            }
                        }
                        None => {
                            flush_remainder(sink.as_ref(), &mut batch).await;
                            return;
                        }
                    }
                }
                _ = &mut timer => {
                    if !batch.is_empty() {
                        flush_and_forward(sink.as_ref(), &mut batch, &out_tx).await;
                    }
                    timer.as_mut().reset(Instant::now() + flush_interval);
                }
            }
        }
    });

    (out_rx, handle)
}

async fn flush_and_forward<T, S: BatchSink<T> + ?Sized>(
    sink: &S,
    batch: &mut Vec<T>,
    out: &mpsc::Sender<T>,
) {
    match sink.process_batch(batch).await {
        Ok(()) => {
            for job in batch.drain(..) {
                if out.send(job).await.is_err() {
                    // Downstream is gone; nothing left to forward to
                    return;
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, size = batch.len(), "stage flush failed, dropping batch");
            batch.clear();
        }
    }
}

async fn flush_remainder<T, S: BatchSink<T> + ?Sized>(sink: &S, batch: &mut Vec<T>) {
    if batch.is_empty() {
        return;
    }

    if let Err(e) = sink.process_batch(batch).await {
        tracing::warn!(error = %e, size = batch.len(), "stage failed to flush final batch");
    }
    batch.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingSink {
        batches: Mutex<Vec<Vec<u32>>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                batches: Mutex::new(Vec::new()),
                fail: std::sync::atomic::AtomicBool::new(false),
            })
        }

        fn recorded(&self) -> Vec<Vec<u32>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchSink<u32> for RecordingSink {
        async fn process_batch(&self, batch: &[u32]) -> Result<(), PipelineError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(PipelineError::Store("sink unavailable".into()));
            }
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }
    }

    fn shutdown_pair() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test(start_paused = true)]
    async fn partial_batch_flushes_on_timer() {
        let sink = RecordingSink::new();
        let (jobs_tx, jobs_rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = shutdown_pair();

        let (mut out, handle) = spawn(
            sink.clone(),
            5,
            Duration::from_millis(500),
            jobs_rx,
            shutdown_rx,
        );

        for i in 0..3u32 {
            jobs_tx.send(i).await.unwrap();
        }

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(sink.recorded(), vec![vec![0, 1, 2]]);
        for i in 0..3u32 {
            assert_eq!(out.recv().await, Some(i));
        }

        drop(jobs_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn full_batch_flushes_immediately_and_resets_timer() {
        let sink = RecordingSink::new();
        let (jobs_tx, jobs_rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = shutdown_pair();

        let (mut out, handle) = spawn(
            sink.clone(),
            5,
            Duration::from_millis(500),
            jobs_rx,
            shutdown_rx,
        );

        for i in 0..5u32 {
            jobs_tx.send(i).await.unwrap();
        }

        // Size flush happens without any timer advance
        for i in 0..5u32 {
            assert_eq!(out.recv().await, Some(i));
        }
        assert_eq!(sink.recorded(), vec![vec![0, 1, 2, 3, 4]]);

        // A sixth job waits for the next timer tick, counted from the flush
        jobs_tx.send(5).await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(sink.recorded().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(sink.recorded(), vec![vec![0, 1, 2, 3, 4], vec![5]]);
        assert_eq!(out.recv().await, Some(5));

        drop(jobs_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failed_flush_drops_batch_and_keeps_stage_alive() {
        let sink = RecordingSink::new();
        sink.fail.store(true, std::sync::atomic::Ordering::SeqCst);

        let (jobs_tx, jobs_rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = shutdown_pair();

        let (mut out, handle) = spawn(
            sink.clone(),
            5,
            Duration::from_millis(500),
            jobs_rx,
            shutdown_rx,
        );

        jobs_tx.send(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(sink.recorded().is_empty());

        // Stage recovers once the sink does
        sink.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        jobs_tx.send(2).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(sink.recorded(), vec![vec![2]]);
        assert_eq!(out.recv().await, Some(2));

        drop(jobs_tx);
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn remainder_flushes_on_channel_close() {
        let sink = RecordingSink::new();
        let (jobs_tx, jobs_rx) = mpsc::channel(16);
        let (_shutdown_tx, shutdown_rx) = shutdown_pair();

        let (mut out, handle) = spawn(
            sink.clone(),
            5,
            Duration::from_millis(500),
            jobs_rx,
            shutdown_rx,
        );

        jobs_tx.send(7).await.unwrap();
        jobs_tx.send(8).await.unwrap();
        drop(jobs_tx);

        handle.await.unwrap();
        assert_eq!(sink.recorded(), vec![vec![7, 8]]);

        // Final batch is not forwarded; the output channel just closes
        assert_eq!(out.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn remainder_flushes_on_cancellation() {
        let sink = RecordingSink::new();
        let (jobs_tx, jobs_rx) = mpsc::channel(16);
        let (shutdown_tx, shutdown_rx) = shutdown_pair();

        let (_out, handle) = spawn(
            sink.clone(),
            5,
            Duration::from_millis(500),
            jobs_rx,
            shutdown_rx,
        );

        jobs_tx.send(9).await.unwrap();
        tokio::task::yield_now().await;

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(sink.recorded(), vec![vec![9]]);
    }
}
