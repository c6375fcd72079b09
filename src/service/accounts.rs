use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::auth::{AccessToken, CredentialService};
use crate::error::{Error, Result};
use crate::mail::Mailer;
use crate::store::Store;
use crate::types::*;
use crate::validation::{validate_email, validate_password, validate_person_name};

/// Returned by `forgot_password` whatever happens behind it.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account with that email exists, a password reset link has been sent.";

pub struct AccountService {
    store: Arc<dyn Store>,
    credentials: Arc<CredentialService>,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn Store>,
        credentials: Arc<CredentialService>,
        mailer: Arc<dyn Mailer>,
        frontend_url: &str,
    ) -> Self {
        Self {
            store,
            credentials,
            mailer,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn signup(
        &self,
        first_name: &str,
        surname: &str,
        email: &str,
        password: &str,
    ) -> Result<UserPublic> {
        validate_person_name(first_name, "First name")?;
        validate_person_name(surname, "Surname")?;
        let email = email.trim();
        validate_email(email)?;
        validate_password(password)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            first_name: first_name.trim().to_string(),
            surname: surname.trim().to_string(),
            email: email.to_string(),
            password_hash: self.credentials.hash_password(password)?,
            created_at: Utc::now(),
            is_premium: false,
            memory_limit: FREE_MEMORY_LIMIT,
        };
        self.store.create_user(&user)?;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user.into())
    }

    /// Unknown email, wrong password and lookup failures all surface as
    /// `Error::InvalidCredentials`, and every branch runs one Argon2 check.
    pub fn login(&self, email: &str, password: &str) -> Result<AccessToken> {
        let user = match self.store.get_user_by_email(email.trim()) {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("Login for unknown email");
                self.credentials.reject_password(password);
                return Err(Error::InvalidCredentials);
            }
            Err(e) => {
                tracing::error!(error = %e, "User lookup failed during login");
                self.credentials.reject_password(password);
                return Err(Error::InvalidCredentials);
            }
        };

        if !self.credentials.verify_password(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(Error::InvalidCredentials);
        }

        self.credentials
            .issue_access_token(&user.id, Some(user.email.as_str()), None)
    }

    pub fn get_user_info(&self, user_id: &str) -> Result<UserPublic> {
        self.store
            .get_user(user_id)?
            .map(UserPublic::from)
            .ok_or(Error::NotFound)
    }

    /// Changes a single profile field; passwords are hashed first.
    pub fn reset_field(&self, user_id: &str, field: UserField, new_value: &str) -> Result<()> {
        let value = match field {
            UserField::FirstName => {
                validate_person_name(new_value, "First name")?;
                new_value.trim().to_string()
            }
            UserField::Surname => {
                validate_person_name(new_value, "Surname")?;
                new_value.trim().to_string()
            }
            UserField::Email => {
                let email = new_value.trim();
                validate_email(email)?;
                email.to_string()
            }
            UserField::Password => {
                validate_password(new_value)?;
                self.credentials.hash_password(new_value)?
            }
        };

        self.store.update_user_field(user_id, field, &value)?;
        tracing::info!(user_id, field = field.column(), "User field updated");
        Ok(())
    }

    /// Always answers with `FORGOT_PASSWORD_MESSAGE`, right after the email
    /// lookup. Token issuance and delivery run in the background and only log
    /// their failures.
    pub async fn forgot_password(&self, email: &str) -> &'static str {
        self.dispatch_reset_link(email);
        FORGOT_PASSWORD_MESSAGE
    }

    /// Starts delivery of a reset link when the email belongs to an account.
    pub(crate) fn dispatch_reset_link(&self, email: &str) -> Option<JoinHandle<()>> {
        let user = match self.store.get_user_by_email(email.trim()) {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::debug!("Password reset for unknown email");
                return None;
            }
            Err(e) => {
                tracing::error!(error = %e, "User lookup failed during password reset");
                return None;
            }
        };

        let credentials = self.credentials.clone();
        let mailer = self.mailer.clone();
        let frontend_url = self.frontend_url.clone();

        Some(tokio::spawn(async move {
            if let Err(e) = send_reset_link(&credentials, mailer.as_ref(), &frontend_url, &user).await {
                tracing::error!(
                    user_id = %user.id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Password reset email not sent"
                );
            }
        }))
    }

    /// The token is consumed before the password changes, so a replayed token
    /// can never set a second password.
    pub fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        validate_password(new_password)?;

        let user_id = self.credentials.verify_reset_token(token)?;
        self.credentials.consume_reset_token(token)?;

        let hash = self.credentials.hash_password(new_password)?;
        self.store
            .update_user_field(&user_id, UserField::Password, &hash)?;

        tracing::info!(user_id = %user_id, "Password reset");
        Ok(())
    }

    pub fn upgrade_to_premium(&self, user_id: &str) -> Result<UserPublic> {
        self.store
            .set_user_plan(user_id, true, PREMIUM_MEMORY_LIMIT)?;
        tracing::info!(user_id, "User upgraded to premium");
        self.get_user_info(user_id)
    }
}

async fn send_reset_link(
    credentials: &CredentialService,
    mailer: &dyn Mailer,
    frontend_url: &str,
    user: &User,
) -> Result<()> {
    let token = credentials.issue_reset_token(&user.id)?;
    let link = format!(
        "{}/reset-password?token={}",
        frontend_url,
        urlencoding::encode(&token)
    );

    mailer.send_password_reset(&user.email, &link).await?;
    tracing::info!(user_id = %user.id, "Password reset email sent");
    Ok(())
}
