//! Authenticated HTTP transport with token refresh and failure counting.

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};
use url::Url;

use crate::auth::{Credential, Token, TokenState};
use crate::config::{RetryConfig, TokenResetPolicy};
use crate::error::{Error, Result};
use crate::retry::{retry, retry_if};

/// Issuer string asserted in the signed claim set.
const CLIENT_ISSUER: &str = "bunkerhill_inference_rust_client";

/// Lifetime of the outbound claim set.
const CLAIMS_LIFETIME_MINUTES: i64 = 30;

#[derive(Serialize)]
struct AuthClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    exp: i64,
}

#[derive(Serialize)]
struct AuthRequestBody<'a> {
    jwt: &'a str,
}

#[derive(Deserialize)]
struct AuthResponseBody {
    token: String,
}

/// Token state and failure counter, guarded together so no two callers
/// race a refresh against a clear.
#[derive(Debug, Default)]
struct AuthState {
    token: TokenState,
    failures: u32,
}

/// HTTP client that authenticates every request with a bearer token,
/// refreshing the token when it is missing, expired, or force-invalidated
/// by the failure policy.
pub(crate) struct JwtHttpClient {
    http: reqwest::Client,
    base_url: Url,
    auth_path: String,
    credential: Credential,
    retry_config: RetryConfig,
    failure_threshold: u32,
    reset_policy: TokenResetPolicy,
    state: Mutex<AuthState>,
}

impl JwtHttpClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: Url,
        auth_path: String,
        credential: Credential,
        retry_config: RetryConfig,
        failure_threshold: u32,
        reset_policy: TokenResetPolicy,
    ) -> Self {
        Self {
            http,
            base_url,
            auth_path,
            credential,
            retry_config,
            failure_threshold: failure_threshold.max(1),
            reset_policy,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Performs an authenticated GET for `resource_path` and deserializes
    /// the JSON response body.
    ///
    /// The whole attempt (token refresh included) is wrapped in the retry
    /// loop, except that an [`Error::AuthenticationFailed`] is fatal: the
    /// authorization POST carries its own retry budget, so a refresh that
    /// already exhausted it is not retried again here.
    pub(crate) async fn get_json<T>(&self, resource_path: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = self.base_url.join(resource_path).map_err(|e| {
            Error::configuration(format!("invalid resource path '{}': {}", resource_path, e))
        })?;

        let value = retry_if(
            &self.retry_config,
            |e: &Error| !matches!(e, Error::AuthenticationFailed { .. }),
            || self.get_json_once(&url),
        )
        .await?;

        // The body was valid JSON (counter already reset); a shape
        // mismatch is still a parse failure from the caller's view.
        serde_json::from_value(value).map_err(|e| Error::ResponseParseFailed {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    /// One authenticated GET attempt.
    async fn get_json_once(&self, url: &Url) -> Result<serde_json::Value> {
        let mut state = self.state.lock().await;

        self.ensure_authenticated(&mut state).await?;
        let bearer = state.token.encoded().ok_or_else(|| Error::AuthenticationFailed {
            url: url.to_string(),
            status: None,
            detail: "no token held after authorization".into(),
        })?;
        let auth_header = format!("Bearer {}", bearer);

        let response = match self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, auth_header)
            .send()
            .await
        {
            Ok(response) => response,
            // No response received: the failure policy only counts
            // answered requests, so the counter and token are left
            // alone and the retry loop handles the connection error.
            // Status 0 marks "no response received".
            Err(e) => {
                return Err(Error::RequestFailed {
                    url: url.to_string(),
                    method: "GET".into(),
                    status: 0,
                    detail: e.to_string(),
                })
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() >= 400 {
            return Err(self.handle_failed_request(
                &mut state,
                url,
                "GET",
                status.as_u16(),
                body,
            ));
        }

        // The request itself succeeded; a parse failure must not touch
        // the failure counter.
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => {
                state.failures = 0;
                Ok(value)
            }
            Err(e) => Err(Error::ResponseParseFailed {
                url: url.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Refreshes the token when the held one is missing, expired, or
    /// undecodable.
    async fn ensure_authenticated(&self, state: &mut AuthState) -> Result<()> {
        if !state.token.is_valid(Utc::now()) {
            self.authorize(state).await?;
        }
        Ok(())
    }

    /// Signs a fresh claim set and exchanges it for a bearer token.
    ///
    /// The POST is wrapped in the retry loop; exhausting it is fatal.
    async fn authorize(&self, state: &mut AuthState) -> Result<()> {
        let url = self.base_url.join(&self.auth_path).map_err(|e| {
            Error::configuration(format!("invalid auth path '{}': {}", self.auth_path, e))
        })?;

        let exp = (Utc::now() + ChronoDuration::minutes(CLAIMS_LIFETIME_MINUTES)).timestamp();
        let claims = AuthClaims { iss: CLIENT_ISSUER, sub: &self.credential.identity, exp };
        let client_jwt =
            self.credential.key.sign_claims(&claims).map_err(|e| Error::AuthenticationFailed {
                url: url.to_string(),
                status: None,
                detail: format!("failed to sign auth claims: {}", e),
            })?;

        let body =
            retry(&self.retry_config, || self.send_authorization_request(&url, &client_jwt))
                .await?;

        debug!(identity = %self.credential.identity, "authorized, bearer token refreshed");
        state.token.replace(Token::new(body.token));
        Ok(())
    }

    /// One authorization POST attempt.
    async fn send_authorization_request(
        &self,
        url: &Url,
        client_jwt: &str,
    ) -> Result<AuthResponseBody> {
        let response = self
            .http
            .post(url.clone())
            .json(&AuthRequestBody { jwt: client_jwt })
            .send()
            .await
            .map_err(|e| Error::AuthenticationFailed {
                url: url.to_string(),
                status: None,
                detail: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() >= 400 {
            return Err(Error::AuthenticationFailed {
                url: url.to_string(),
                status: Some(status.as_u16()),
                detail: extract_detail(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::AuthenticationFailed {
            url: url.to_string(),
            status: None,
            detail: format!("invalid auth response body: {}", e),
        })
    }

    /// Bumps the failure counter, applies the token reset policy, and
    /// builds the `RequestFailed` error for the caller.
    ///
    /// The reset rule clears the token when the running count lands on
    /// residue 1 modulo the threshold (counts 1, 4, 7, ... for the default
    /// threshold of 3), not on every Nth failure uniformly.
    fn handle_failed_request(
        &self,
        state: &mut AuthState,
        url: &Url,
        method: &str,
        status: u16,
        body: String,
    ) -> Error {
        state.failures += 1;

        let modulo_hit = state.failures % self.failure_threshold == 1;
        let should_clear = match self.reset_policy {
            TokenResetPolicy::InvalidOrModulo => {
                !state.token.is_valid(Utc::now()) || modulo_hit
            }
            TokenResetPolicy::ModuloOnly => modulo_hit,
        };
        if should_clear {
            state.token.clear();
        }

        error!(
            %url,
            method,
            status,
            consecutive_failures = state.failures,
            token_cleared = should_clear,
            "request to inference API failed"
        );

        Error::RequestFailed {
            url: url.to_string(),
            method: method.to_string(),
            status,
            detail: extract_detail(&body),
        }
    }
}

/// Pulls the `detail` field out of a JSON error body when present,
/// otherwise returns the raw text.
fn extract_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
