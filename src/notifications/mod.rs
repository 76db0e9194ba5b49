//! Outbound email.
//!
//! Delivery infrastructure lives elsewhere; this module only hands messages
//! to a [`Mailer`]. Dispatch never blocks the request that triggered it and
//! failures are logged, not retried.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::metrics::NOTIFICATIONS_SENT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("mail endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail endpoint returned {0}")]
    Rejected(reqwest::StatusCode),
    #[error("no recipients")]
    NoRecipients,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError>;
}

/// Posts each message as JSON to a relay endpoint.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    text: &'a str,
}

impl HttpMailer {
    pub fn new(endpoint: String, from: String) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            from,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    fn channel(&self) -> &'static str {
        "http"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RelayPayload {
                from: &self.from,
                to: &email.to,
                subject: &email.subject,
                text: &email.body,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(response.status()));
        }
        Ok(())
    }
}

/// Writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    fn channel(&self) -> &'static str {
        "log"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError> {
        info!(to = ?email.to, subject = %email.subject, "email (log only)");
        Ok(())
    }
}

/// Picks the HTTP relay when an endpoint is configured, the log mailer otherwise.
pub fn mailer_from_config(config: &AppConfig) -> Arc<dyn Mailer> {
    match config.mail_endpoint.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(endpoint) => match HttpMailer::new(endpoint.to_string(), config.mail_from.clone()) {
            Ok(mailer) => Arc::new(mailer),
            Err(e) => {
                warn!(error = %e, "could not build HTTP mailer, falling back to log mailer");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    }
}

/// Sends `email` on a background task.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: OutgoingEmail) {
    tokio::spawn(async move {
        deliver(mailer.as_ref(), &email).await;
    });
}

/// Sends and records the outcome; errors end here.
pub async fn deliver(mailer: &dyn Mailer, email: &OutgoingEmail) -> bool {
    let result = if email.to.is_empty() {
        Err(NotificationError::NoRecipients)
    } else {
        mailer.send(email).await
    };

    let outcome = if result.is_ok() { "sent" } else { "failed" };
    NOTIFICATIONS_SENT
        .with_label_values(&[mailer.channel(), outcome])
        .inc();

    if let Err(e) = result {
        warn!(error = %e, subject = %email.subject, "email dispatch failed");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    mock! {
        pub Relay {}

        #[async_trait]
        impl Mailer for Relay {
            fn channel(&self) -> &'static str;
            async fn send(&self, email: &OutgoingEmail) -> Result<(), NotificationError>;
        }
    }

    fn relay() -> MockRelay {
        let mut relay = MockRelay::new();
        relay.expect_channel().return_const("mock");
        relay
    }

    fn email(to: &[&str]) -> OutgoingEmail {
        OutgoingEmail {
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: "Report published".into(),
            body: "Weekly report for KITCHEN-01 is available.".into(),
        }
    }

    #[tokio::test]
    async fn delivers_to_mailer() {
        let mut mailer = relay();
        mailer
            .expect_send()
            .withf(|email| email.to == vec!["client@example.com".to_string()])
            .times(1)
            .returning(|_| Ok(()));
        assert!(deliver(&mailer, &email(&["client@example.com"])).await);
    }

    #[tokio::test]
    async fn empty_recipient_list_is_not_sent() {
        let mut mailer = relay();
        mailer.expect_send().never();
        assert!(!deliver(&mailer, &email(&[])).await);
    }

    #[tokio::test]
    async fn relay_rejection_is_reported_as_failure() {
        let mut mailer = relay();
        mailer
            .expect_send()
            .times(1)
            .returning(|_| Err(NotificationError::Rejected(reqwest::StatusCode::BAD_GATEWAY)));
        assert!(!deliver(&mailer, &email(&["pm@example.com"])).await);
    }

    #[tokio::test]
    async fn unreachable_relay_fails_quietly() {
        let mailer = HttpMailer::new("http://127.0.0.1:9/send".into(), "noreply@test".into()).unwrap();
        assert!(!deliver(&mailer, &email(&["pm@example.com"])).await);
    }
}
