//! Google sign-in: turning a client-supplied token into a verified identity.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum VerifyError {
    /// The provider did not accept the token.
    #[error("token rejected by identity provider")]
    Rejected,

    /// The ID token was issued for another client.
    #[error("token audience does not match the configured client id")]
    Audience,

    #[error("identity carries no email address")]
    MissingEmail,

    #[error("identity provider request failed")]
    Transport(#[from] reqwest::Error),
}

/// Who the caller proved to be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoogleIdentity {
    /// Stable Google account id.
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: String,
}

/// Verifies sign-in tokens.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify an ID token (mobile clients).
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, VerifyError>;

    /// Verify an OAuth access token (web client).
    async fn verify_access_token(&self, access_token: &str)
        -> Result<GoogleIdentity, VerifyError>;
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    aud: String,
    #[serde(default)]
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default, alias = "id")]
    sub: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    picture: String,
}

/// [`IdentityVerifier`] backed by Google's `tokeninfo` and `userinfo` endpoints.
#[derive(Debug, Clone)]
pub struct GoogleVerifier {
    http: reqwest::Client,
    client_id: String,
    tokeninfo_url: String,
    userinfo_url: String,
}

impl GoogleVerifier {
    /// `client_id` is the expected ID-token audience; empty disables the check.
    pub fn new(client_id: impl Into<String>) -> Result<Self, VerifyError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            client_id: client_id.into(),
            tokeninfo_url: TOKENINFO_URL.into(),
            userinfo_url: USERINFO_URL.into(),
        })
    }

    /// Point the verifier at other endpoints.
    pub fn with_endpoints(mut self, tokeninfo_url: &str, userinfo_url: &str) -> Self {
        self.tokeninfo_url = tokeninfo_url.to_owned();
        self.userinfo_url = userinfo_url.to_owned();
        self
    }
}

fn identity(subject: String, email: String, name: String, picture: String) -> Result<GoogleIdentity, VerifyError> {
    if email.trim().is_empty() {
        return Err(VerifyError::MissingEmail);
    }
    Ok(GoogleIdentity {
        subject,
        email,
        name,
        picture,
    })
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, VerifyError> {
        let resp = self
            .http
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "id token rejected");
            return Err(VerifyError::Rejected);
        }
        let info: TokenInfo = resp.json().await?;
        if !self.client_id.is_empty() && info.aud != self.client_id {
            warn!("id token issued for another client");
            return Err(VerifyError::Audience);
        }
        identity(info.sub, info.email, info.name, info.picture)
    }

    async fn verify_access_token(
        &self,
        access_token: &str,
    ) -> Result<GoogleIdentity, VerifyError> {
        let resp = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            debug!(status = %resp.status(), "access token rejected");
            return Err(VerifyError::Rejected);
        }
        let info: UserInfo = resp.json().await?;
        identity(info.sub, info.email, info.name, info.picture)
    }
}
