//! Bounded worker pool
//!
//! A fixed set of worker tasks consuming one bounded queue. The queue
//! bound is the admission policy: when it is full, `push` blocks the
//! submitter, which backpressures the accept loop instead of dropping
//! commands. Once a job is accepted it is never discarded; shutdown
//! drains everything already queued.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use gfxd_core::{GfxdError, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Default)]
struct Counters {
    busy: usize,
    executed: u64,
}

/// Fixed-size pool with a bounded admission queue. Sizes are set once
/// at construction and never change at runtime.
pub struct WorkerPool {
    tx: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    counters: Arc<Mutex<Counters>>,
    thread_count: usize,
}

impl WorkerPool {
    /// `thread_count` concurrent executors, `max_queue_size` jobs queued
    /// beyond the ones running (clamped to at least 1).
    pub fn new(thread_count: usize, max_queue_size: usize) -> Self {
        assert!(thread_count > 0, "pool needs at least one worker");

        let (tx, rx) = mpsc::channel::<Job>(max_queue_size.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Mutex::new(Counters::default()));

        let workers = (0..thread_count)
            .map(|id| {
                let rx = Arc::clone(&rx);
                let counters = Arc::clone(&counters);
                tokio::spawn(worker_loop(id, rx, counters))
            })
            .collect();

        Self { tx, workers, counters, thread_count }
    }

    /// Enqueue a job. Blocks the submitter while the queue is at
    /// capacity; errors only if the pool has shut down.
    pub async fn push<F>(&self, job: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tx
            .send(Box::pin(job))
            .await
            .map_err(|_| GfxdError::Pool("pool is shut down".into()))
    }

    /// Snapshot of pool occupancy.
    pub fn status(&self) -> PoolStatus {
        let counters = self.counters.lock();
        PoolStatus {
            total: self.thread_count,
            busy: counters.busy,
            idle: self.thread_count - counters.busy,
            executed: counters.executed,
        }
    }

    /// Close the queue and wait for every worker to finish. Jobs already
    /// accepted keep running; queued jobs are drained, not dropped.
    pub async fn shutdown(self) {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "worker task panicked");
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    counters: Arc<Mutex<Counters>>,
) {
    loop {
        // Hold the receiver lock only while waiting for a job, never
        // while running one.
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else { break };

        counters.lock().busy += 1;
        job.await;
        let mut c = counters.lock();
        c.busy -= 1;
        c.executed += 1;
    }
    tracing::debug!(worker = id, "worker exiting");
}

/// Status of the worker pool
#[derive(Debug, Clone)]
pub struct PoolStatus {
    pub total: usize,
    pub busy: usize,
    pub idle: usize,
    pub executed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;
    use tokio::time::timeout;

    async fn wait_for(count: &AtomicUsize, expect: usize) {
        for _ in 0..200 {
            if count.load(Ordering::SeqCst) >= expect {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("expected {expect} jobs to start");
    }

    #[tokio::test]
    async fn saturated_pool_blocks_the_submitter() {
        let pool = WorkerPool::new(2, 1);
        let gate = Arc::new(Semaphore::new(0));
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let make_job = |gate: Arc<Semaphore>, started: Arc<AtomicUsize>, finished: Arc<AtomicUsize>| async move {
            started.fetch_add(1, Ordering::SeqCst);
            let _permit = gate.acquire().await.unwrap();
            finished.fetch_add(1, Ordering::SeqCst);
        };

        // Two run, one sits in the queue.
        for _ in 0..3 {
            pool.push(make_job(gate.clone(), started.clone(), finished.clone()))
                .await
                .unwrap();
        }
        wait_for(&started, 2).await;

        // Fourth submission must block, not drop.
        let blocked = timeout(
            Duration::from_millis(100),
            pool.push(make_job(gate.clone(), started.clone(), finished.clone())),
        )
        .await;
        assert!(blocked.is_err(), "push succeeded on a saturated pool");

        // Free the workers; submission now goes through and all jobs run.
        gate.add_permits(16);
        pool.push(make_job(gate.clone(), started.clone(), finished.clone()))
            .await
            .unwrap();
        pool.shutdown().await;
        assert_eq!(finished.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn shutdown_drains_queued_jobs() {
        let pool = WorkerPool::new(1, 4);
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let ran = ran.clone();
            pool.push(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                ran.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        }

        pool.shutdown().await;
        assert_eq!(ran.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn status_counts_executed_jobs() {
        let pool = WorkerPool::new(2, 2);
        for _ in 0..3 {
            pool.push(async {}).await.unwrap();
        }
        // Let the trivial jobs finish.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let status = pool.status();
        assert_eq!(status.total, 2);
        assert_eq!(status.executed, 3);
        assert_eq!(status.busy, 0);
    }
}
