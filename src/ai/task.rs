//! Remote task tracking shared by every provider.
//!
//! A provider reports its own state strings; they are mapped once into
//! [`ProviderState`] and driven through [`poll_until_terminal`], which owns the
//! interval/attempt policy and the caller-visible progress events.

use super::ProgressSink;
use crate::models::QueueUpdate;
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Message surfaced when a provider fails a task without saying why.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Task failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            TaskState::Queued => 0,
            TaskState::Processing => 1,
            TaskState::Succeeded | TaskState::Failed => 2,
        }
    }
}

/// Provider state after decoding the wire string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderState {
    Waiting,
    Processing,
    Success,
    Failed,
    Unrecognized(String),
}

impl ProviderState {
    pub fn from_kie(raw: &str) -> Self {
        match raw {
            "waiting" => ProviderState::Waiting,
            "processing" => ProviderState::Processing,
            "success" => ProviderState::Success,
            "fail" | "failed" => ProviderState::Failed,
            other => ProviderState::Unrecognized(other.to_string()),
        }
    }

    pub fn from_fal(raw: &str) -> Self {
        match raw {
            "IN_QUEUE" => ProviderState::Waiting,
            "IN_PROGRESS" => ProviderState::Processing,
            "COMPLETED" => ProviderState::Success,
            other => ProviderState::Unrecognized(other.to_string()),
        }
    }

    pub fn task_state(&self) -> Option<TaskState> {
        match self {
            ProviderState::Waiting => Some(TaskState::Queued),
            ProviderState::Processing => Some(TaskState::Processing),
            ProviderState::Success => Some(TaskState::Succeeded),
            ProviderState::Failed => Some(TaskState::Failed),
            ProviderState::Unrecognized(_) => None,
        }
    }
}

/// One remote unit of work, owned by the call that submitted it.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
    pub attempts: u32,
}

impl Task {
    pub fn new(id: String) -> Self {
        Self {
            id,
            state: TaskState::Queued,
            created_at: Utc::now(),
            last_polled_at: None,
            attempts: 0,
        }
    }

    /// Moves forward to `next`. Regressions and moves out of a terminal state
    /// are ignored; returns whether the state changed.
    pub fn advance(&mut self, next: TaskState) -> bool {
        if self.state.is_terminal() || next.rank() <= self.state.rank() {
            return false;
        }
        self.state = next;
        true
    }

    fn record_poll(&mut self) {
        self.attempts += 1;
        self.last_polled_at = Some(Utc::now());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_attempts: 200,
        }
    }
}

impl PollPolicy {
    /// Worst-case wait before giving up.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }

    fn processing_log(&self, attempt: u32) -> String {
        format!(
            "Processing... ({}s elapsed)",
            (self.interval * attempt).as_secs()
        )
    }
}

/// What a single status query returned.
#[derive(Debug, Clone)]
pub struct StatusSnapshot<P> {
    pub state: ProviderState,
    pub queue_position: Option<u32>,
    pub logs: Vec<String>,
    pub fail_message: Option<String>,
    pub payload: P,
}

impl<P> StatusSnapshot<P> {
    pub fn new(state: ProviderState, payload: P) -> Self {
        Self {
            state,
            queue_position: None,
            logs: Vec::new(),
            fail_message: None,
            payload,
        }
    }
}

#[async_trait]
pub trait TaskStatusSource: Send + Sync {
    type Payload: Send;

    async fn fetch_status(&self, task_id: &str) -> Result<StatusSnapshot<Self::Payload>>;
}

/// Polls `task` until it succeeds, fails, or the attempt budget runs out.
///
/// Each poll emits a progress event before the loop decides whether to keep
/// going. Transport errors from `source` propagate immediately.
pub async fn poll_until_terminal<S>(
    source: &S,
    task: &mut Task,
    policy: &PollPolicy,
    progress: &dyn ProgressSink,
) -> Result<S::Payload>
where
    S: TaskStatusSource + ?Sized,
{
    for attempt in 0..policy.max_attempts {
        let snapshot = source.fetch_status(&task.id).await?;
        task.record_poll();
        debug!("Poll attempt {} for task {}: {:?}", attempt, task.id, snapshot.state);

        if let Some(next) = snapshot.state.task_state() {
            task.advance(next);
        }

        match snapshot.state {
            // A task that already started processing never reports as queued
            // again, even if the provider briefly says so.
            ProviderState::Waiting if task.state == TaskState::Processing => {
                progress.on_update(QueueUpdate::InProgress {
                    logs: vec![policy.processing_log(attempt)],
                });
            }
            ProviderState::Waiting => {
                progress.on_update(QueueUpdate::InQueue {
                    position: snapshot.queue_position.unwrap_or(attempt),
                });
            }
            ProviderState::Processing => {
                let logs = if snapshot.logs.is_empty() {
                    vec![policy.processing_log(attempt)]
                } else {
                    snapshot.logs
                };
                progress.on_update(QueueUpdate::InProgress { logs });
            }
            ProviderState::Success => {
                info!("Task {} completed after {} polls", task.id, task.attempts);
                progress.on_update(QueueUpdate::Completed);
                return Ok(snapshot.payload);
            }
            ProviderState::Failed => {
                let message = snapshot
                    .fail_message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
                error!("Task {} failed: {}", task.id, message);
                progress.on_update(QueueUpdate::Failed {
                    message: message.clone(),
                });
                return Err(Error::ProviderFailure(message));
            }
            ProviderState::Unrecognized(raw) => {
                warn!(
                    "Task {} reported unrecognized state '{}', polling again",
                    task.id, raw
                );
            }
        }

        if attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    error!(
        "Task {} did not finish after {} polls",
        task.id, policy.max_attempts
    );
    Err(Error::Timeout {
        attempts: policy.max_attempts,
        waited: policy.budget(),
    })
}
