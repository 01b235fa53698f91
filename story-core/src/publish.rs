//! The publication channel seen from the core.
//!
//! The core never talks to a chat service directly; the binary supplies a
//! [`Publisher`] that posts text to the public channel.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Why a story could not be posted to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The channel service answered but refused the post.
    #[error("publication rejected: {0}")]
    Rejected(String),

    /// The channel service could not be reached.
    #[error("channel unreachable: {0}")]
    Unreachable(String),

    #[error("publication timed out after {0:?}")]
    Timeout(Duration),
}

/// One-shot posting of text to the public channel.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, text: &str) -> Result<(), PublishError>;
}

/// Publish with an upper bound on how long the channel may take.
///
/// A timeout is reported like any other publication failure.
pub async fn publish_with_timeout(
    publisher: &dyn Publisher,
    text: &str,
    limit: Duration,
) -> Result<(), PublishError> {
    match tokio::time::timeout(limit, publisher.publish(text)).await {
        Ok(result) => result,
        Err(_) => Err(PublishError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl Publisher for Stalled {
        async fn publish(&self, _text: &str) -> Result<(), PublishError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    struct Refusing;

    #[async_trait]
    impl Publisher for Refusing {
        async fn publish(&self, _text: &str) -> Result<(), PublishError> {
            Err(PublishError::Rejected("chat not found".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_becomes_publish_error() {
        let err = publish_with_timeout(&Stalled, "text", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, PublishError::Timeout(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_publisher_error_passes_through() {
        let err = publish_with_timeout(&Refusing, "text", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected(ref m) if m == "chat not found"));
    }
}
