//! Retry with exponential backoff for page fetches.

use std::future::Future;
use std::time::Duration;

use crate::error::EtlError;

/// Upper bound on a single backoff wait.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(300);

/// Sleeps between attempts. Production code uses [`TokioSleeper`]; tests
/// substitute an implementation that records the requested delays.
pub trait Sleeper {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send;
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(delay)
    }
}

/// How an attempt's failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    /// Connection failure, timeout, 5xx, 429.
    Transient,
    /// Non-JSON or schema-mismatched body. Retried, but reported as a
    /// format error if it is still failing on the last attempt.
    BadBody,
    /// 4xx other than 429.
    Fatal,
}

fn classify(err: &b3_api::Error) -> Disposition {
    use b3_api::Error;
    match err {
        Error::Connect(_) | Error::Timeout => Disposition::Transient,
        Error::HttpStatus { status, .. } if *status == 429 || *status >= 500 => {
            Disposition::Transient
        }
        Error::HttpStatus { .. } => Disposition::Fatal,
        Error::NonJson { .. } | Error::Decode(_) => Disposition::BadBody,
        Error::InvalidUrl(_) | Error::InvalidQuery(_) => Disposition::Fatal,
    }
}

/// Retry parameters: `max_attempts` total attempts, the first retry waits
/// `base_delay`, each later retry multiplies the previous wait by
/// `backoff_multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (1-based). Attempt 1 never waits.
    /// Saturates at [`MAX_RETRY_DELAY`].
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt < 2 {
            return Duration::ZERO;
        }
        let exp = (attempt - 2).min(30) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exp);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(MAX_RETRY_DELAY)
            .min(MAX_RETRY_DELAY)
    }

    /// Runs `op` until it succeeds, fails fatally, or attempts run out.
    pub async fn run<T, F, Fut, S>(&self, label: &str, sleeper: &S, mut op: F) -> Result<T, EtlError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, b3_api::Error>>,
        S: Sleeper,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => {
                    tracing::debug!("{} succeeded on attempt {}/{}", label, attempt, max_attempts);
                    return Ok(value);
                }
                Err(err) => err,
            };

            let disposition = classify(&err);
            let last = attempt >= max_attempts;
            match (disposition, last) {
                (Disposition::Fatal, _) => {
                    tracing::error!("{} failed with non-retryable error: {}", label, err);
                    return Err(match err {
                        b3_api::Error::HttpStatus { status, body } => {
                            EtlError::ClientRequestError { status, body }
                        }
                        other => EtlError::Http(other),
                    });
                }
                (Disposition::BadBody, true) => {
                    tracing::error!("{} returned an invalid body on the last attempt: {}", label, err);
                    return Err(EtlError::InvalidResponseFormat(err.to_string()));
                }
                (Disposition::Transient, true) => {
                    tracing::error!("{} failed after {} attempts: {}", label, attempt, err);
                    return Err(EtlError::ExtractionFailed {
                        attempts: attempt,
                        source: err,
                    });
                }
                (Disposition::BadBody, false) | (Disposition::Transient, false) => {
                    attempt += 1;
                    let delay = self.delay_before(attempt);
                    tracing::warn!(
                        "{} request failed (attempt {}/{}): {}; retrying in {:.1}s",
                        label,
                        attempt - 1,
                        max_attempts,
                        err,
                        delay.as_secs_f64()
                    );
                    sleeper.sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, delay: Duration) -> impl Future<Output = ()> + Send {
            self.delays.lock().unwrap().push(delay);
            std::future::ready(())
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }

    /// Returns the errors in order, then `Ok(attempt)`.
    async fn run_script(
        policy: &RetryPolicy,
        sleeper: &RecordingSleeper,
        script: Vec<b3_api::Error>,
    ) -> (Result<u32, EtlError>, u32) {
        let calls = Mutex::new(0u32);
        let result = policy
            .run("test", sleeper, || {
                let mut n = calls.lock().unwrap();
                *n += 1;
                let out = match script.get(*n as usize - 1) {
                    Some(err) => Err(err.clone()),
                    None => Ok(*n),
                };
                async move { out }
            })
            .await;
        let n = *calls.lock().unwrap();
        (result, n)
    }

    #[test]
    fn delay_schedule() {
        let p = policy(5);
        assert_eq!(p.delay_before(1), Duration::ZERO);
        assert_eq!(p.delay_before(2), Duration::from_secs(1));
        assert_eq!(p.delay_before(3), Duration::from_secs(2));
        assert_eq!(p.delay_before(4), Duration::from_secs(4));
    }

    #[test]
    fn huge_multiplier_saturates() {
        let p = RetryPolicy {
            max_attempts: 40,
            base_delay: Duration::from_secs(2),
            backoff_multiplier: 1e30,
        };
        assert_eq!(p.delay_before(2), Duration::from_secs(2));
        assert_eq!(p.delay_before(3), MAX_RETRY_DELAY);
        assert_eq!(p.delay_before(40), MAX_RETRY_DELAY);
    }

    #[tokio::test]
    async fn three_timeouts_exhaust_with_backoff() {
        let sleeper = RecordingSleeper::default();
        let script = vec![b3_api::Error::Timeout; 3];
        let (result, calls) = run_script(&policy(3), &sleeper, script).await;

        assert_eq!(calls, 3);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        match result {
            Err(EtlError::ExtractionFailed { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source, b3_api::Error::Timeout);
            }
            other => panic!("expected ExtractionFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn not_found_fails_immediately() {
        let sleeper = RecordingSleeper::default();
        let script = vec![b3_api::Error::HttpStatus {
            status: 404,
            body: "Not Found".to_string(),
        }];
        let (result, calls) = run_script(&policy(3), &sleeper, script).await;

        assert_eq!(calls, 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
        assert!(matches!(
            result,
            Err(EtlError::ClientRequestError { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn rate_limit_and_server_errors_are_retried() {
        let sleeper = RecordingSleeper::default();
        let script = vec![
            b3_api::Error::HttpStatus {
                status: 429,
                body: String::new(),
            },
            b3_api::Error::HttpStatus {
                status: 503,
                body: String::new(),
            },
        ];
        let (result, calls) = run_script(&policy(3), &sleeper, script).await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn bad_body_recovers_before_last_attempt() {
        let sleeper = RecordingSleeper::default();
        let script = vec![b3_api::Error::NonJson {
            content_type: "text/html".to_string(),
            body: "<html>".to_string(),
        }];
        let (result, _) = run_script(&policy(3), &sleeper, script).await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn bad_body_on_last_attempt_is_format_error() {
        let sleeper = RecordingSleeper::default();
        let script = vec![
            b3_api::Error::Timeout,
            b3_api::Error::Decode("missing field `results`".to_string()),
        ];
        let (result, calls) = run_script(&policy(2), &sleeper, script).await;
        assert_eq!(calls, 2);
        assert!(matches!(result, Err(EtlError::InvalidResponseFormat(_))));
    }

    #[tokio::test]
    async fn single_attempt_policy_never_sleeps() {
        let sleeper = RecordingSleeper::default();
        let (result, calls) =
            run_script(&policy(1), &sleeper, vec![b3_api::Error::Timeout]).await;
        assert_eq!(calls, 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
        assert!(matches!(
            result,
            Err(EtlError::ExtractionFailed { attempts: 1, .. })
        ));
    }
}
