//! Background watcher that reports a download's completion to its chat.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::client::{JobClient, JobHandle};
use crate::core::event::ChatId;
use crate::core::transport::{notify, ChatTransport};
use crate::retry::RetryPolicy;

/// How a watcher ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Completed { name: String },
    GaveUp { failures: u32 },
}

/// Polls one job until it completes, then notifies the originating chat once.
pub struct DownloadWatcher {
    jobs: Arc<dyn JobClient>,
    transport: Arc<dyn ChatTransport>,
    job: JobHandle,
    chat_id: ChatId,
    policy: RetryPolicy,
}

impl DownloadWatcher {
    pub fn new(
        jobs: Arc<dyn JobClient>,
        transport: Arc<dyn ChatTransport>,
        job: JobHandle,
        chat_id: ChatId,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            jobs,
            transport,
            job,
            chat_id,
            policy,
        }
    }

    /// Run the watcher on its own task.
    pub fn spawn(self) -> JoinHandle<WatchOutcome> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) -> WatchOutcome {
        tracing::info!("Watching {} for chat {}", self.job, self.chat_id);
        let mut failures = 0u32;

        loop {
            sleep(self.policy.interval).await;

            match self.jobs.is_complete(self.job).await {
                Ok(true) => break,
                Ok(false) => {
                    failures = 0;
                    tracing::debug!("{} still downloading", self.job);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!("Error checking status of {}: {}", self.job, e);
                    if self.policy.exhausted(failures) {
                        tracing::error!(
                            "Giving up on {} after {} failed checks",
                            self.job,
                            failures
                        );
                        return WatchOutcome::GaveUp { failures };
                    }
                }
            }
        }

        let name = match self.jobs.name(self.job).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Error retrieving name of {}: {}", self.job, e);
                self.job.to_string()
            }
        };

        tracing::info!("Download completed: {}", name);
        notify(
            self.transport.as_ref(),
            self.chat_id,
            &format!("Download completed: {}", name),
        )
        .await;

        WatchOutcome::Completed { name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::fake::RecordingTransport;
    use crate::downloads::JobSource;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Reports "not complete" `pending` times, then "complete".
    struct ScriptedJobs {
        pending: u32,
        failing: bool,
        name_fails: bool,
        complete_queries: AtomicU32,
        name_queries: AtomicU32,
    }

    impl ScriptedJobs {
        fn new(pending: u32) -> Self {
            Self {
                pending,
                failing: false,
                name_fails: false,
                complete_queries: AtomicU32::new(0),
                name_queries: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl JobClient for ScriptedJobs {
        async fn submit(&self, _source: &JobSource, _download_dir: &str) -> Result<JobHandle> {
            Ok(JobHandle(1))
        }

        async fn is_complete(&self, _job: JobHandle) -> Result<bool> {
            let n = self.complete_queries.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(Error::Job("daemon unreachable".to_string()));
            }
            Ok(n >= self.pending)
        }

        async fn name(&self, _job: JobHandle) -> Result<String> {
            self.name_queries.fetch_add(1, Ordering::SeqCst);
            if self.name_fails {
                return Err(Error::Job("gone".to_string()));
            }
            Ok("debian-12.iso".to_string())
        }
    }

    fn watcher(
        jobs: &Arc<ScriptedJobs>,
        transport: &Arc<RecordingTransport>,
        policy: RetryPolicy,
    ) -> DownloadWatcher {
        DownloadWatcher::new(jobs.clone(), transport.clone(), JobHandle(5), 99, policy)
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifies_once_after_n_plus_one_polls() {
        let jobs = Arc::new(ScriptedJobs::new(3));
        let transport = Arc::new(RecordingTransport::default());

        let outcome = watcher(&jobs, &transport, RetryPolicy::default()).run().await;

        assert_eq!(
            outcome,
            WatchOutcome::Completed {
                name: "debian-12.iso".to_string()
            }
        );
        assert_eq!(jobs.complete_queries.load(Ordering::SeqCst), 4);
        assert_eq!(jobs.name_queries.load(Ordering::SeqCst), 1);
        assert_eq!(
            transport.texts_for(99),
            vec!["Download completed: debian-12.iso".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_poll_waits_one_interval() {
        let jobs = Arc::new(ScriptedJobs::new(0));
        let transport = Arc::new(RecordingTransport::default());
        let start = tokio::time::Instant::now();

        watcher(&jobs, &transport, RetryPolicy::default()).run().await;

        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(jobs.complete_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_name_failure_still_notifies_once() {
        let mut scripted = ScriptedJobs::new(0);
        scripted.name_fails = true;
        let jobs = Arc::new(scripted);
        let transport = Arc::new(RecordingTransport::default());

        watcher(&jobs, &transport, RetryPolicy::default()).run().await;

        assert_eq!(
            transport.texts_for(99),
            vec!["Download completed: torrent #5".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_when_policy_says_so() {
        let mut scripted = ScriptedJobs::new(0);
        scripted.failing = true;
        let jobs = Arc::new(scripted);
        let transport = Arc::new(RecordingTransport::default());
        let policy = RetryPolicy::new(Duration::from_secs(5)).with_give_up_after(Some(3));

        let outcome = watcher(&jobs, &transport, policy).spawn().await.unwrap();

        assert_eq!(outcome, WatchOutcome::GaveUp { failures: 3 });
        assert_eq!(jobs.complete_queries.load(Ordering::SeqCst), 3);
        assert_eq!(jobs.name_queries.load(Ordering::SeqCst), 0);
        assert_eq!(transport.total_sent(), 0);
    }
}
