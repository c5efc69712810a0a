//! 持久化延迟任务队列
//!
//! redb 支撑的延迟任务后端：`submit(queue, kind, payload, delay)` 保证
//! 任务不早于 `now + delay` 被调用，且至少调用一次。任务在成功或最终
//! 失败后自动从队列移除——队列不是事实来源，领域状态才是。
//!
//! 进程重启后已入队的任务原样存活，worker 扫描时照常触发，无需重算。
//!
//! Note: redb operations are synchronous for stability.

use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use shared::util::now_millis;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::db::{StorageError, StorageResult};

/// Table for delayed jobs: key = job_id, value = JSON-serialized JobRecord
const JOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs");

/// One enqueued delayed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub queue: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub submitted_at: i64,
    /// Earliest invocation instant (unix millis)
    pub fire_at: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// Delayed-job backend capability
///
/// The guarantee is at-least-once, not-before-delay delivery; callers must
/// tolerate duplicate invocations.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Enqueue a job for invocation no earlier than `now + delay`.
    /// Returns the job id.
    async fn submit(
        &self,
        queue: &str,
        kind: &str,
        payload: serde_json::Value,
        delay: Duration,
    ) -> anyhow::Result<String>;
}

/// Handler invoked when a job of its queue fires
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Queue name this handler serves
    fn queue(&self) -> &str;

    async fn handle(&self, kind: &str, payload: &serde_json::Value) -> anyhow::Result<()>;
}

/// redb-backed delayed job queue with a polling worker
pub struct JobQueue {
    db: Arc<Database>,
    handlers: RwLock<HashMap<String, Arc<dyn JobHandler>>>,
    max_attempts: u32,
    retry_delay_ms: i64,
}

impl JobQueue {
    pub fn open(
        path: impl AsRef<Path>,
        max_attempts: u32,
        retry_delay_ms: i64,
    ) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db, max_attempts, retry_delay_ms)
    }

    #[cfg(test)]
    pub fn open_in_memory(max_attempts: u32, retry_delay_ms: i64) -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db, max_attempts, retry_delay_ms)
    }

    fn init(db: Database, max_attempts: u32, retry_delay_ms: i64) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(JOBS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            handlers: RwLock::new(HashMap::new()),
            max_attempts,
            retry_delay_ms,
        })
    }

    /// Register the handler for a queue name. One handler per queue; a
    /// repeated registration replaces the previous one.
    pub fn register_handler(&self, handler: Arc<dyn JobHandler>) {
        let queue = handler.queue().to_string();
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.insert(queue, handler);
    }

    /// All jobs still enqueued, in key order
    pub fn pending_jobs(&self) -> StorageResult<Vec<JobRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(JOBS_TABLE)?;

        let mut jobs = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let job: JobRecord = serde_json::from_slice(value.value())?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    fn insert_job(&self, job: &JobRecord) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(JOBS_TABLE)?;
            let value = serde_json::to_vec(job)?;
            table.insert(job.id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    fn remove_job(&self, job_id: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(JOBS_TABLE)?;
            table.remove(job_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Record a failed attempt and push the job back with a fixed retry
    /// delay
    fn mark_job_failed(&self, job_id: &str, error: &str) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(JOBS_TABLE)?;
            let job_opt = if let Some(value) = table.get(job_id)? {
                let job: JobRecord = serde_json::from_slice(value.value())?;
                Some(job)
            } else {
                None
            };

            if let Some(mut job) = job_opt {
                job.attempts += 1;
                job.last_error = Some(error.to_string());
                job.fire_at = now_millis() + self.retry_delay_ms;
                let value = serde_json::to_vec(&job)?;
                table.insert(job_id, value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    fn due_jobs(&self, now: i64) -> StorageResult<Vec<JobRecord>> {
        Ok(self
            .pending_jobs()?
            .into_iter()
            .filter(|job| job.fire_at <= now)
            .collect())
    }

    /// Run the polling worker until shutdown
    pub async fn run(self: Arc<Self>, poll_interval: Duration, shutdown: CancellationToken) {
        tracing::info!(poll_interval_ms = poll_interval.as_millis() as u64, "job queue worker started");

        let mut tick = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("job queue worker shutting down");
                    break;
                }
                _ = tick.tick() => {
                    self.process_due().await;
                }
            }
        }
    }

    /// Invoke handlers for every due job
    ///
    /// Success and terminal failure both remove the job; a transient
    /// failure re-enqueues it with the retry delay until `max_attempts`
    /// is exhausted.
    async fn process_due(&self) {
        let due = match self.due_jobs(now_millis()) {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!(error = %e, "failed to scan job queue");
                return;
            }
        };

        for job in due {
            let handler = {
                let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
                handlers.get(&job.queue).cloned()
            };

            let result = match handler {
                Some(handler) => handler.handle(&job.kind, &job.payload).await,
                None => Err(anyhow::anyhow!("no handler registered for queue {}", job.queue)),
            };

            match result {
                Ok(()) => {
                    tracing::debug!(job_id = %job.id, kind = %job.kind, "job completed");
                    if let Err(e) = self.remove_job(&job.id) {
                        tracing::error!(job_id = %job.id, error = %e, "failed to remove completed job");
                    }
                }
                Err(e) if job.attempts + 1 >= self.max_attempts => {
                    tracing::error!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempts = job.attempts + 1,
                        error = %e,
                        "job failed terminally, dropping"
                    );
                    if let Err(e2) = self.remove_job(&job.id) {
                        tracing::error!(job_id = %job.id, error = %e2, "failed to drop job");
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempts = job.attempts + 1,
                        error = %e,
                        "job failed, will retry"
                    );
                    if let Err(e2) = self.mark_job_failed(&job.id, &e.to_string()) {
                        tracing::error!(job_id = %job.id, error = %e2, "failed to record job failure");
                    }
                }
            }
        }
    }
}

#[async_trait]
impl JobBackend for JobQueue {
    async fn submit(
        &self,
        queue: &str,
        kind: &str,
        payload: serde_json::Value,
        delay: Duration,
    ) -> anyhow::Result<String> {
        let now = now_millis();
        let job = JobRecord {
            id: shared::util::new_id(),
            queue: queue.to_string(),
            kind: kind.to_string(),
            payload,
            submitted_at: now,
            fire_at: now + delay.as_millis() as i64,
            attempts: 0,
            last_error: None,
        };
        self.insert_job(&job).map_err(StorageError::from)?;

        tracing::debug!(job_id = %job.id, queue, kind, fire_at = job.fire_at, "job submitted");
        Ok(job.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingJobHandler {
        queue: String,
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingJobHandler {
        fn new(queue: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                queue: queue.to_string(),
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl JobHandler for CountingJobHandler {
        fn queue(&self) -> &str {
            &self.queue
        }

        async fn handle(&self, _kind: &str, _payload: &serde_json::Value) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("handler failure")
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_due_job_fires_and_is_removed() {
        let queue = JobQueue::open_in_memory(3, 0).unwrap();
        let handler = CountingJobHandler::new("q", false);
        queue.register_handler(handler.clone());

        queue
            .submit("q", "k", serde_json::json!({"eventId": "g1"}), Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(queue.pending_jobs().unwrap().len(), 1);

        queue.process_due().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        // Auto-removal on success
        assert!(queue.pending_jobs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_job_not_invoked_before_delay() {
        let queue = JobQueue::open_in_memory(3, 0).unwrap();
        let handler = CountingJobHandler::new("q", false);
        queue.register_handler(handler.clone());

        queue
            .submit("q", "k", serde_json::json!({}), Duration::from_secs(3600))
            .await
            .unwrap();

        queue.process_due().await;

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.pending_jobs().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_drops() {
        let queue = JobQueue::open_in_memory(2, 0).unwrap();
        let handler = CountingJobHandler::new("q", true);
        queue.register_handler(handler.clone());

        queue
            .submit("q", "k", serde_json::json!({}), Duration::ZERO)
            .await
            .unwrap();

        // First attempt: failure recorded, job kept for retry
        queue.process_due().await;
        let pending = queue.pending_jobs().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
        assert!(pending[0].last_error.is_some());

        // Second attempt exhausts max_attempts: terminal drop
        queue.process_due().await;
        assert!(queue.pending_jobs().unwrap().is_empty());
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_queue_counts_as_failure() {
        let queue = JobQueue::open_in_memory(1, 0).unwrap();

        queue
            .submit("orphan", "k", serde_json::json!({}), Duration::ZERO)
            .await
            .unwrap();
        queue.process_due().await;

        // max_attempts = 1: dropped immediately
        assert!(queue.pending_jobs().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jobs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.redb");

        {
            let queue = JobQueue::open(&path, 3, 1000).unwrap();
            queue
                .submit("q", "k", serde_json::json!({"eventId": "g1"}), Duration::from_secs(60))
                .await
                .unwrap();
        }

        let queue = JobQueue::open(&path, 3, 1000).unwrap();
        let pending = queue.pending_jobs().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, "k");
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let queue = Arc::new(JobQueue::open_in_memory(3, 0).unwrap());
        let shutdown = CancellationToken::new();

        let worker = tokio::spawn(queue.clone().run(Duration::from_millis(10), shutdown.clone()));
        shutdown.cancel();
        worker.await.unwrap();
    }
}
