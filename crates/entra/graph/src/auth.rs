//! OAuth2 client-credentials tokens for Microsoft Graph

use crate::cloud::GraphSettings;
use crate::error::{GraphError, GraphResult};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::RwLock;

/// Service principal credentials used to obtain tokens
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Caches the access token of one credential and refreshes it shortly
/// before it expires.
#[derive(Debug)]
pub struct TokenCache {
    credentials: ClientCredentials,
    token_url: String,
    scope: String,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
    grace_period: Duration,
}

impl TokenCache {
    pub fn new(credentials: ClientCredentials, settings: &GraphSettings, http: reqwest::Client) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            settings.login_endpoint(),
            credentials.tenant_id
        );
        let scope = format!("{}/.default", settings.graph_endpoint());

        Self {
            credentials,
            token_url,
            scope,
            http,
            cached: RwLock::new(None),
            grace_period: Duration::minutes(5),
        }
    }

    /// Returns a valid access token, acquiring a new one if needed.
    pub async fn token(&self) -> GraphResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired(self.grace_period) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let fresh = self.acquire().await?;
        let access_token = fresh.access_token.clone();
        *self.cached.write().await = Some(fresh);
        Ok(access_token)
    }

    /// Drops the cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    async fn acquire(&self) -> GraphResult<CachedToken> {
        tracing::debug!(
            tenant_id = %self.credentials.tenant_id,
            client_id = %self.credentials.client_id,
            "Acquiring Graph access token"
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.expose_secret().as_str()),
            ("scope", self.scope.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| GraphError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Auth(format!(
                "token request failed with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GraphError::Auth(format!("invalid token response: {}", e)))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_with_grace() {
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: Utc::now() + Duration::minutes(10),
        };
        assert!(!token.is_expired(Duration::minutes(5)));
        assert!(token.is_expired(Duration::minutes(15)));
    }

    #[test]
    fn test_token_url_uses_tenant() {
        let cache = TokenCache::new(
            ClientCredentials {
                tenant_id: "tenant-1".into(),
                client_id: "client-1".into(),
                client_secret: SecretString::new("s3cret".into()),
            },
            &GraphSettings::default(),
            reqwest::Client::new(),
        );
        assert_eq!(
            cache.token_url,
            "https://login.microsoftonline.com/tenant-1/oauth2/v2.0/token"
        );
        assert_eq!(cache.scope, "https://graph.microsoft.com/.default");
    }
}
