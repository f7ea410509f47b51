//! Ordered fallback runner shared by text extraction, model invocation and rendering.
//!
//! A chain is a list of members tried one at a time, in order. The first member that
//! returns `Ok` wins and the remaining members are never touched. Every failure is
//! recorded with its [`FailureClass`] so the caller can classify exhaustion. Members are
//! never raced: each attempt completes (or times out) before the next one starts.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// The member does not handle this kind of input.
    Unsupported,
    /// The member ran but produced nothing usable.
    Empty,
    /// The input could not be parsed by this member.
    Corrupt,
    Network,
    Throttled,
    Validation,
    ModelNotReady,
    Timeout,
    Unexpected,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Unsupported => "unsupported",
            FailureClass::Empty => "empty",
            FailureClass::Corrupt => "corrupt",
            FailureClass::Network => "network",
            FailureClass::Throttled => "throttled",
            FailureClass::Validation => "validation",
            FailureClass::ModelNotReady => "model_not_ready",
            FailureClass::Timeout => "timeout",
            FailureClass::Unexpected => "unexpected",
        }
    }

    /// Transient or member-specific failures. The runner falls through on every class;
    /// this only feeds logging and telemetry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FailureClass::Network
                | FailureClass::Throttled
                | FailureClass::Validation
                | FailureClass::ModelNotReady
                | FailureClass::Empty
                | FailureClass::Timeout
        )
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single chain attempt.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{class}: {message}")]
pub struct AttemptError {
    pub class: FailureClass,
    pub message: String,
}

impl AttemptError {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Unsupported, message)
    }

    pub fn empty(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Empty, message)
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Corrupt, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Validation, message)
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(FailureClass::Unexpected, message)
    }
}

/// Anything that can sit in a chain.
pub trait ChainMember: Send + Sync {
    fn id(&self) -> &str;

    /// Upper bound for one attempt. `None` means the member bounds itself.
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

impl<T: ChainMember + ?Sized> ChainMember for Box<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }
}

impl<T: ChainMember + ?Sized> ChainMember for Arc<T> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn timeout(&self) -> Option<Duration> {
        (**self).timeout()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptFailure {
    pub member: String,
    pub class: FailureClass,
    pub message: String,
}

/// Every member of a chain failed.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{stage} chain exhausted after {} attempt(s): {}", .failures.len(), summarize(.failures))]
pub struct ChainExhausted {
    pub stage: &'static str,
    pub failures: Vec<AttemptFailure>,
}

impl ChainExhausted {
    /// True when the chain had members and every one failed with `class`.
    pub fn all(&self, class: FailureClass) -> bool {
        !self.failures.is_empty() && self.failures.iter().all(|f| f.class == class)
    }

    pub fn any(&self, class: FailureClass) -> bool {
        self.failures.iter().any(|f| f.class == class)
    }

    pub fn summary(&self) -> String {
        summarize(&self.failures)
    }
}

fn summarize(failures: &[AttemptFailure]) -> String {
    if failures.is_empty() {
        return "no members configured".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{} ({}): {}", f.member, f.class, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result of a chain run with its provenance.
#[derive(Debug, Clone)]
pub struct ChainSuccess<T> {
    pub value: T,
    /// Id of the member that produced `value`.
    pub member: String,
    /// Failures of the members tried before the winner.
    pub skipped: Vec<AttemptFailure>,
    pub elapsed: Duration,
}

/// Runs `attempt` against each member in order until one succeeds.
pub async fn run_chain<'a, M, T, F, Fut>(
    stage: &'static str,
    members: &'a [M],
    mut attempt: F,
) -> Result<ChainSuccess<T>, ChainExhausted>
where
    M: ChainMember,
    F: FnMut(&'a M) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let started = Instant::now();
    let mut failures = Vec::new();

    for (index, member) in members.iter().enumerate() {
        let attempt_started = Instant::now();
        let outcome = match member.timeout() {
            Some(limit) => match tokio::time::timeout(limit, attempt(member)).await {
                Ok(result) => result,
                Err(_) => Err(AttemptError::new(
                    FailureClass::Timeout,
                    format!("no result within {}ms", limit.as_millis()),
                )),
            },
            None => attempt(member).await,
        };

        match outcome {
            Ok(value) => {
                info!(
                    stage,
                    member = member.id(),
                    position = index + 1,
                    elapsed_ms = attempt_started.elapsed().as_millis() as u64,
                    "Chain member succeeded"
                );
                return Ok(ChainSuccess {
                    value,
                    member: member.id().to_string(),
                    skipped: failures,
                    elapsed: started.elapsed(),
                });
            }
            Err(e) => {
                if e.class == FailureClass::Unsupported {
                    debug!(stage, member = member.id(), reason = %e.message, "Chain member skipped");
                } else {
                    warn!(
                        stage,
                        member = member.id(),
                        class = %e.class,
                        recoverable = e.class.is_recoverable(),
                        error = %e.message,
                        "Chain member failed, falling back"
                    );
                }
                failures.push(AttemptFailure {
                    member: member.id().to_string(),
                    class: e.class,
                    message: e.message,
                });
            }
        }
    }

    warn!(stage, attempts = failures.len(), "Chain exhausted");
    Err(ChainExhausted { stage, failures })
}

/// Runs CPU-bound attempt work on the blocking pool. A panic inside `work` is reported
/// with `panic_class` instead of tearing down the job.
pub async fn blocking_attempt<T, W>(panic_class: FailureClass, work: W) -> Result<T, AttemptError>
where
    T: Send + 'static,
    W: FnOnce() -> Result<T, AttemptError> + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(AttemptError::new(panic_class, "worker panicked")),
        Err(e) => Err(AttemptError::unexpected(format!("worker cancelled: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Member {
        id: &'static str,
        timeout: Option<Duration>,
    }

    impl ChainMember for Member {
        fn id(&self) -> &str {
            self.id
        }

        fn timeout(&self) -> Option<Duration> {
            self.timeout
        }
    }

    fn members(ids: &[&'static str]) -> Vec<Member> {
        ids.iter()
            .map(|id| Member { id, timeout: None })
            .collect()
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let chain = members(&["a", "b", "c"]);
        let calls = Mutex::new(Vec::new());
        let calls_ref = &calls;

        let success = run_chain("test", &chain, move |m| async move {
            calls_ref.lock().unwrap().push(m.id);
            match m.id {
                "a" => Err(AttemptError::new(FailureClass::Throttled, "slow down")),
                other => Ok(other.to_uppercase()),
            }
        })
        .await
        .unwrap();

        assert_eq!(success.value, "B");
        assert_eq!(success.member, "b");
        assert_eq!(success.skipped.len(), 1);
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_exhaustion_records_every_failure_in_order() {
        let chain = members(&["a", "b"]);
        let err = run_chain("test", &chain, |m| async move {
            Err::<(), _>(AttemptError::corrupt(format!("{} broke", m.id)))
        })
        .await
        .unwrap_err();

        assert_eq!(err.stage, "test");
        assert_eq!(err.failures.len(), 2);
        assert_eq!(err.failures[0].member, "a");
        assert!(err.all(FailureClass::Corrupt));
        assert!(err.summary().contains("b broke"));
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let chain: Vec<Member> = Vec::new();
        let err = run_chain("test", &chain, |_| async { Ok::<_, AttemptError>(()) })
            .await
            .unwrap_err();
        assert!(err.failures.is_empty());
        assert!(!err.all(FailureClass::Unsupported));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_through_to_next_member() {
        let chain = vec![
            Member {
                id: "slow",
                timeout: Some(Duration::from_secs(1)),
            },
            Member {
                id: "fast",
                timeout: Some(Duration::from_secs(1)),
            },
        ];

        let success = run_chain("test", &chain, |m| async move {
            if m.id == "slow" {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            Ok::<_, AttemptError>(m.id)
        })
        .await
        .unwrap();

        assert_eq!(success.member, "fast");
        assert_eq!(success.skipped[0].class, FailureClass::Timeout);
        assert!(success.elapsed >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_blocking_attempt_reports_panic() {
        let result: Result<(), _> =
            blocking_attempt(FailureClass::Corrupt, || panic!("parser bug")).await;
        assert_eq!(result.unwrap_err().class, FailureClass::Corrupt);
    }

    #[test]
    fn test_recoverable_classes() {
        assert!(FailureClass::Throttled.is_recoverable());
        assert!(FailureClass::Timeout.is_recoverable());
        assert!(!FailureClass::Unexpected.is_recoverable());
        assert!(!FailureClass::Corrupt.is_recoverable());
    }
}
