use reqwest::Method;
use taskdeck_core::{Credentials, LoginResponse, User};
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult, Operation};

impl ApiClient {
    pub async fn register(&self, credentials: &Credentials) -> ApiResult<User> {
        credentials
            .validate()
            .map_err(|e| ApiError::validation(Operation::Register, e))?;

        let user: User = self
            .send_json(Operation::Register, Method::POST, &["auth", "register"], credentials)
            .await?;
        info!(user_id = %user.id, "Registered new account");
        Ok(user)
    }

    /// Authenticate and, when the response carries both a token and a user
    /// id, persist them as the current session.
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<LoginResponse> {
        credentials
            .validate()
            .map_err(|e| ApiError::validation(Operation::Login, e))?;

        let response: LoginResponse = self
            .send_json(Operation::Login, Method::POST, &["auth", "login"], credentials)
            .await?;

        if response.token.trim().is_empty() || response.user.id.trim().is_empty() {
            warn!("Login response lacks a token or user id; session not stored");
            return Ok(response);
        }

        self.session()
            .login(response.user.id.clone(), response.token.clone())
            .await
            .map_err(|e| ApiError::session(Operation::Login, e))?;

        info!(user_id = %response.user.id, "Logged in");
        Ok(response)
    }

    /// Profile of the user the current token belongs to.
    pub async fn me(&self) -> ApiResult<User> {
        self.get_json(Operation::Profile, &["auth", "me"]).await
    }

    /// Drop the local session. The backend keeps no server-side session, so
    /// nothing is sent.
    pub async fn logout(&self) -> Result<(), taskdeck_session::SessionError> {
        self.session().logout().await
    }
}
