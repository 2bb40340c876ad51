//! Provider fallback pipeline.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{MailError, MailMessage, MailTransport};
use crate::observability::metrics;

/// Every provider attempt failed. One aggregated error, not one per
/// provider.
#[derive(Debug)]
pub struct DeliveryError {
    pub attempts: Vec<(&'static str, MailError)>,
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all providers failed")?;
        for (name, err) in &self.attempts {
            write!(f, "; {}: {}", name, err)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeliveryError {}

/// Tries an ordered list of transports until one accepts the message.
pub struct MailDispatcher {
    transports: Vec<Arc<dyn MailTransport>>,
    attempt_timeout: Duration,
}

impl MailDispatcher {
    pub fn new(transports: Vec<Arc<dyn MailTransport>>, attempt_timeout: Duration) -> Self {
        Self {
            transports,
            attempt_timeout,
        }
    }

    /// Attempt delivery, falling through the provider list in order.
    /// Each attempt is raced against its own timer; a fired timer drops the
    /// attempt's future, aborting the underlying request, and counts as a
    /// failure. Returns the accepting provider's name.
    pub async fn dispatch(&self, message: &MailMessage) -> Result<&'static str, DeliveryError> {
        let mut attempts = Vec::new();

        for transport in &self.transports {
            let name = transport.name();
            match tokio::time::timeout(self.attempt_timeout, transport.send(message)).await {
                Ok(Ok(())) => {
                    tracing::info!(provider = name, "Mail delivered");
                    metrics::record_mail_attempt(name, "ok");
                    return Ok(name);
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = name, error = %e, "Provider attempt failed");
                    metrics::record_mail_attempt(name, "error");
                    attempts.push((name, e));
                }
                Err(_) => {
                    let secs = self.attempt_timeout.as_secs();
                    tracing::warn!(provider = name, timeout_secs = secs, "Provider attempt timed out");
                    metrics::record_mail_attempt(name, "timeout");
                    attempts.push((name, MailError::Timeout(secs)));
                }
            }
        }

        Err(DeliveryError { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockTransport {
        name: &'static str,
        fail: bool,
        hang: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<MailMessage>>,
    }

    impl MockTransport {
        fn ok(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail: false,
                hang: false,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                fail: true,
                ..Self::unwrapped(name)
            })
        }

        fn hanging(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                hang: true,
                ..Self::unwrapped(name)
            })
        }

        fn unwrapped(name: &'static str) -> Self {
            Self {
                name,
                fail: false,
                hang: false,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MailTransport for MockTransport {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(message.clone());
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                Err(MailError::Status(500))
            } else {
                Ok(())
            }
        }
    }

    fn message() -> MailMessage {
        MailMessage {
            from: "forms@example.com".to_string(),
            to: "sales@example.com".to_string(),
            subject: "New lead".to_string(),
            html: "<p>Asha Rao</p>".to_string(),
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn primary_success_skips_fallback() {
        let primary = MockTransport::ok("primary");
        let secondary = MockTransport::ok("secondary");
        let dispatcher = MailDispatcher::new(
            vec![primary.clone(), secondary.clone()],
            Duration::from_secs(15),
        );

        let provider = dispatcher.dispatch(&message()).await.unwrap();
        assert_eq!(provider, "primary");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn fallback_invoked_exactly_once_with_same_content() {
        // Primary fails, so the secondary sees the identical message exactly once.
        let primary = MockTransport::failing("primary");
        let secondary = MockTransport::ok("secondary");
        let dispatcher = MailDispatcher::new(
            vec![primary.clone(), secondary.clone()],
            Duration::from_secs(15),
        );

        let msg = message();
        let provider = dispatcher.dispatch(&msg).await.unwrap();
        assert_eq!(provider, "secondary");
        assert_eq!(secondary.calls(), 1);
        assert_eq!(secondary.seen.lock().unwrap()[0], msg);
    }

    #[tokio::test]
    async fn both_failing_yields_single_aggregated_error() {
        // Exactly one DeliveryError carrying both attempts.
        let primary = MockTransport::failing("primary");
        let secondary = MockTransport::failing("secondary");
        let dispatcher = MailDispatcher::new(
            vec![primary.clone(), secondary.clone()],
            Duration::from_secs(15),
        );

        let err = dispatcher.dispatch(&message()).await.unwrap_err();
        assert_eq!(err.attempts.len(), 2);
        assert_eq!(err.attempts[0].0, "primary");
        assert_eq!(err.attempts[1].0, "secondary");
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_primary_resolves_within_timeout() {
        // A provider that never responds is treated as failed at the
        // deadline, and the fallback still runs.
        let primary = MockTransport::hanging("primary");
        let secondary = MockTransport::ok("secondary");
        let dispatcher = MailDispatcher::new(
            vec![primary.clone(), secondary.clone()],
            Duration::from_secs(15),
        );

        let started = tokio::time::Instant::now();
        let provider = dispatcher.dispatch(&message()).await.unwrap();
        assert_eq!(provider, "secondary");
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_gets_its_own_budget() {
        let primary = MockTransport::hanging("primary");
        let secondary = MockTransport::hanging("secondary");
        let dispatcher = MailDispatcher::new(
            vec![primary.clone(), secondary.clone()],
            Duration::from_secs(15),
        );

        let started = tokio::time::Instant::now();
        let err = dispatcher.dispatch(&message()).await.unwrap_err();
        assert_eq!(started.elapsed(), Duration::from_secs(30));
        assert!(matches!(err.attempts[0].1, MailError::Timeout(15)));
        assert!(matches!(err.attempts[1].1, MailError::Timeout(15)));
    }
}
