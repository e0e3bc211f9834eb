//! OAuth refresh-token exchange.
//!
//! Only Google access tokens are short-lived here; Meta and TikTok issue
//! long-lived tokens that are re-granted through the connect flow instead.

use crate::error::RefreshError;
use adportal_core::config::GoogleConfig;
use adportal_core::models::TokenSet;
use adportal_core::Platform;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

#[async_trait]
pub trait TokenRefresher: Send + Sync {
    fn platform(&self) -> Platform;

    /// Exchange a refresh token for a new token set. The returned set keeps
    /// the old refresh token when the endpoint does not rotate it.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, RefreshError>;
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    pub(crate) fn into_token_set(self, previous_refresh_token: &str) -> Result<TokenSet, RefreshError> {
        if self.access_token.is_empty() {
            return Err(RefreshError::Malformed("empty access_token".into()));
        }
        Ok(TokenSet {
            access_token: self.access_token,
            refresh_token: Some(
                self.refresh_token
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| previous_refresh_token.to_string()),
            ),
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
        })
    }
}

pub struct GoogleTokenRefresher {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl GoogleTokenRefresher {
    pub fn new(config: &GoogleConfig, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl TokenRefresher for GoogleTokenRefresher {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, RefreshError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "Google token endpoint responded");
        if !status.is_success() {
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(160).collect(),
            });
        }
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| RefreshError::Malformed(e.to_string()))?;
        parsed.into_token_set(refresh_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_token_response_keeps_previous_refresh_token() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"ya29.new","expires_in":3599,"token_type":"Bearer"}"#)
                .unwrap();
        let tokens = parsed.into_token_set("1//old").unwrap();
        assert_eq!(tokens.access_token, "ya29.new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//old"));
        assert!(tokens.expires_at.unwrap() > Utc::now());
    }

    #[test]
    fn test_token_response_rotated_refresh_token() {
        let parsed: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"1//new"}"#).unwrap();
        let tokens = parsed.into_token_set("1//old").unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//new"));
        assert!(tokens.expires_at.is_none());
    }

    #[rstest]
    #[case::not_rotated(r#"{"access_token":"a","expires_in":3599}"#, "1//old")]
    #[case::rotated(r#"{"access_token":"a","refresh_token":"1//new"}"#, "1//new")]
    #[case::blank_rotation(r#"{"access_token":"a","refresh_token":""}"#, "1//old")]
    fn test_refresh_token_carry_over(#[case] body: &str, #[case] expected: &str) {
        let parsed: TokenResponse = serde_json::from_str(body).unwrap();
        let tokens = parsed.into_token_set("1//old").unwrap();
        assert_eq!(tokens.refresh_token.as_deref(), Some(expected));
    }

    #[test]
    fn test_empty_access_token_is_malformed() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token":""}"#).unwrap();
        assert!(matches!(parsed.into_token_set("r"), Err(RefreshError::Malformed(_))));
    }
}
