//! OAuth Provider Client
//!
//! Authorization-code flow against a standard OAuth 2.0 / OpenID provider:
//! build the authorize URL, exchange the code for an access token, then read
//! the userinfo endpoint.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::domain::repository::{OAuthProfile, OAuthProvider};
use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Clone)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    pub redirect_uri: String,
    pub scopes: String,
}

#[derive(Clone)]
pub struct HttpOAuthProvider {
    client: reqwest::Client,
    config: OAuthClientConfig,
}

impl HttpOAuthProvider {
    pub fn new(config: OAuthClientConfig) -> IdentityResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| IdentityError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
}

impl OAuthProvider for HttpOAuthProvider {
    fn authorize_url(&self, state: &str) -> IdentityResult<String> {
        let url = Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scopes.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| IdentityError::Internal(format!("Invalid authorize URL: {e}")))?;

        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> IdentityResult<OAuthProfile> {
        let token: TokenResponse = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| IdentityError::OAuthProvider(format!("token exchange: {e}")))?
            .json()
            .await
            .map_err(|e| IdentityError::OAuthProvider(format!("token response: {e}")))?;

        let info: UserInfoResponse = self
            .client
            .get(&self.config.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| IdentityError::OAuthProvider(format!("userinfo: {e}")))?
            .json()
            .await
            .map_err(|e| IdentityError::OAuthProvider(format!("userinfo response: {e}")))?;

        let email = info
            .email
            .ok_or_else(|| IdentityError::InvalidProfile("provider returned no email".into()))?;

        Ok(OAuthProfile {
            email,
            email_verified: info.email_verified,
            name: info.name,
        })
    }
}
