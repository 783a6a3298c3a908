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

//! The `send_email` job: account activation mail for new users.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;
use uuid::Uuid;

use super::SEND_EMAIL;
use crate::dal::UserReader;
use crate::error::JobError;
use crate::mailer::{Email, Mailer};
use crate::models::outbox_item::{JobType, Payload};
use crate::models::user::User;
use crate::outbox::{JobContext, JobHandler};

const ACTIVATION_SUBJECT: &str = "Activate your Autograd account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendEmailPayload {
    pub user_id: Uuid,
}

/// Sender address and public base URL used in activation mails.
#[derive(Debug, Clone)]
pub struct RegistrationEmailSettings {
    pub sender: String,
    pub app_link: Url,
}

/// Builds the activation email for `user`.
pub fn registration_email(
    settings: &RegistrationEmailSettings,
    user: &User,
) -> Result<Email, JobError> {
    if settings.sender.trim().is_empty() {
        return Err(JobError::Rejected("sender address is not configured".into()));
    }
    if user.email.trim().is_empty() {
        return Err(JobError::Rejected(format!("user {} has no email", user.id)));
    }
    if user.active {
        return Err(JobError::Rejected(format!(
            "user {} is already active",
            user.id
        )));
    }

    let mut link = settings.app_link.clone();
    let path = format!("{}/account-activation", link.path().trim_end_matches('/'));
    link.set_path(&path);
    link.query_pairs_mut()
        .clear()
        .append_pair("userID", &user.id.to_string())
        .append_pair("activationToken", &user.activation_token);

    let body_plain = format!(
        "Hi {},\n\nActivate your account by opening the link below:\n\n{}\n",
        user.name, link
    );
    let body = format!(
        "<p>Hi {},</p><p>Activate your account by opening the link below:</p>\
         <p><a href=\"{link}\">{link}</a></p>",
        user.name,
        link = link
    );

    Ok(Email {
        subject: ACTIVATION_SUBJECT.to_string(),
        from: settings.sender.clone(),
        to: vec![user.email.clone()],
        body,
        body_plain,
    })
}

pub struct SendRegistrationEmailHandler {
    mailer: Arc<dyn Mailer>,
    settings: RegistrationEmailSettings,
}

impl SendRegistrationEmailHandler {
    pub fn new(mailer: Arc<dyn Mailer>, settings: RegistrationEmailSettings) -> Self {
        Self { mailer, settings }
    }
}

#[async_trait]
impl JobHandler for SendRegistrationEmailHandler {
    fn job_type(&self) -> JobType {
        JobType::new(SEND_EMAIL)
    }

    async fn handle(&self, ctx: &JobContext, payload: &Payload) -> Result<(), JobError> {
        let SendEmailPayload { user_id } = payload.unmarshal()?;

        let user = ctx
            .database()
            .transaction(move |tx| UserReader::new(tx).find_by_id(user_id))
            .await?
            .ok_or_else(|| JobError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;

        let email = registration_email(&self.settings, &user)?;
        self.mailer.send(&email).await?;

        info!(item_id = %ctx.item_id(), %user_id, "Activation email sent");
        Ok(())
    }
}
