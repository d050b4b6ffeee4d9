//! Bounded wait for an asynchronous upstream job.
//!
//! The loop is an explicit state machine:
//! `Submitted -> Polling -> {Ready | Failed | TimedOut}`. Each poll is
//! classified by HTTP status alone: 200 is ready, 202 is still pending and
//! anything else fails the job. There is no backoff and no cancellation.

use crate::{
    config::PollPolicy,
    error::{GatewayError, Result},
    models::{JobStatus, UpstreamJob},
    upstream::{status_error, UpstreamResponse},
};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Submitted,
    Polling { attempt: u32 },
    Ready,
    Failed(String),
    TimedOut { attempts: u32 },
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollState::Ready | PollState::Failed(_) | PollState::TimedOut { .. }
        )
    }
}

/// Status of one poll response.
pub fn classify(response: &UpstreamResponse) -> JobStatus {
    match response.status {
        200 => JobStatus::Ready,
        202 => JobStatus::Pending,
        _ => JobStatus::Failed,
    }
}

pub struct JobPoller<'a> {
    policy: PollPolicy,
    sleeper: &'a dyn Sleeper,
    upstream: &'a str,
}

impl<'a> JobPoller<'a> {
    pub fn new(policy: PollPolicy, sleeper: &'a dyn Sleeper, upstream: &'a str) -> Self {
        Self {
            policy,
            sleeper,
            upstream,
        }
    }

    /// Polls `job` until it reaches a terminal state and returns the body of
    /// the ready response.
    ///
    /// `poll` performs a single status request. Sleeps happen only between
    /// polls, so a job that is ready on poll `n` has slept `n - 1` times.
    pub async fn wait<F, Fut>(
        &self,
        job: &mut UpstreamJob,
        mut poll: F,
    ) -> Result<UpstreamResponse>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<UpstreamResponse>>,
    {
        let mut state = PollState::Submitted;
        let mut ready = None;

        while !state.is_terminal() {
            state = match state {
                PollState::Submitted => PollState::Polling { attempt: 1 },
                PollState::Polling { attempt } => {
                    log::debug!(
                        "Polling {} job {} (attempt {}/{})",
                        self.upstream,
                        job.job_id,
                        attempt,
                        self.policy.max_attempts
                    );
                    match poll(job.job_id.clone()).await {
                        Err(e) => PollState::Failed(e.message().to_string()),
                        Ok(response) => match classify(&response) {
                            JobStatus::Ready => {
                                ready = Some(response);
                                PollState::Ready
                            }
                            JobStatus::Failed => {
                                let err = status_error(self.upstream, &response);
                                PollState::Failed(err.message().to_string())
                            }
                            JobStatus::Pending if attempt >= self.policy.max_attempts => {
                                PollState::TimedOut { attempts: attempt }
                            }
                            JobStatus::Pending => {
                                self.sleeper.sleep(self.policy.interval).await;
                                PollState::Polling {
                                    attempt: attempt + 1,
                                }
                            }
                        },
                    }
                }
                terminal => terminal,
            };
        }

        match state {
            PollState::Ready => {
                job.status = JobStatus::Ready;
                log::info!("{} job {} is ready", self.upstream, job.job_id);
                ready.ok_or_else(|| GatewayError::upstream("Job finished without a result"))
            }
            PollState::Failed(detail) => {
                job.status = JobStatus::Failed;
                log::error!("{} job {} failed: {}", self.upstream, job.job_id, detail);
                Err(GatewayError::Upstream(detail))
            }
            PollState::TimedOut { attempts } => {
                log::warn!(
                    "{} job {} still pending after {} polls",
                    self.upstream,
                    job.job_id,
                    attempts
                );
                Err(GatewayError::Timeout(format!(
                    "Video generation timed out after {} polls ({}s)",
                    attempts,
                    self.policy.max_wait().as_secs()
                )))
            }
            PollState::Submitted | PollState::Polling { .. } => {
                Err(GatewayError::upstream("Poll loop ended in a non-terminal state"))
            }
        }
    }
}
