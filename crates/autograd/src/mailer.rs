/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Outgoing email.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Failed to deliver email: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    /// HTML body
    pub body: String,
    /// Plain-text alternative
    pub body_plain: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailerError>;
}

/// Writes emails to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailerError> {
        if email.to.is_empty() {
            return Err(MailerError::InvalidEmail("no recipients".to_string()));
        }
        info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            "Email sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn email(to: Vec<String>) -> Email {
        Email {
            subject: "Activate your Autograd account".to_string(),
            from: "noreply@autograd.test".to_string(),
            to,
            body: "<p>hi</p>".to_string(),
            body_plain: "hi".to_string(),
        }
    }

    #[traced_test]
    #[tokio::test]
    async fn test_log_mailer_logs_delivery() {
        LogMailer
            .send(&email(vec!["ada@example.com".to_string()]))
            .await
            .unwrap();
        assert!(logs_contain("Email sent"));
        assert!(logs_contain("ada@example.com"));
    }

    #[tokio::test]
    async fn test_log_mailer_requires_a_recipient() {
        assert!(matches!(
            LogMailer.send(&email(Vec::new())).await,
            Err(MailerError::InvalidEmail(_))
        ));
    }
}
