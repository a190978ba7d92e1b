//! HTTP implementation of [`RemoteAuthClient`] for GitHub-style hosts.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::challenge::{ChallengeReason, ChallengeResolver, OtpDelivery};
use crate::client::{ApplicationAuthorization, AuthClientFactory, RemoteAuthClient};
use crate::error::AuthError;
use crate::host::HostAddress;
use crate::identity::IdentityRecord;

const OTP_HEADER: &str = "X-GitHub-OTP";
const DEFAULT_SCOPES: &[&str] = &["user", "repo", "gist"];
const DEFAULT_NOTE: &str = "hubauth session";

/// Credential exchange against the authorizations endpoint of a GitHub-style
/// API.
///
/// Two-factor enforcement arrives as a 401 carrying an `X-GitHub-OTP:
/// required; <delivery>` header; the code obtained from the resolver is
/// resubmitted in the same header. A 401 with that header *after* a code was
/// sent means the code was rejected.
///
/// # Example
/// ```no_run
/// use hubauth::host::HostAddress;
/// use hubauth::http::HttpAuthClient;
///
/// let client = HttpAuthClient::new(HostAddress::public());
/// ```
pub struct HttpAuthClient {
    client: reqwest::Client,
    host: HostAddress,
    base_url: String,
    scopes: Vec<String>,
    note: String,
}

impl HttpAuthClient {
    pub fn new(host: HostAddress) -> Self {
        let base_url = host.api_base();
        Self {
            client: reqwest::Client::new(),
            host,
            base_url,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            note: DEFAULT_NOTE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    fn basic_auth(username: &str, secret: &str) -> String {
        format!("Basic {}", BASE64.encode(format!("{username}:{secret}")))
    }

    async fn post_authorization(
        &self,
        username: &str,
        secret: &str,
        otp: Option<&str>,
    ) -> Result<ExchangeResponse, AuthError> {
        let url = format!("{}/authorizations", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("Authorization", Self::basic_auth(username, secret))
            .json(&json!({ "scopes": self.scopes, "note": self.note }));
        if let Some(code) = otp {
            request = request.header(OTP_HEADER, code);
        }
        let response = request.send().await?;
        classify_exchange(response).await
    }
}

#[async_trait]
impl RemoteAuthClient for HttpAuthClient {
    async fn exchange_credentials(
        &self,
        username: &str,
        secret: &str,
        resolver: &dyn ChallengeResolver,
    ) -> Result<ApplicationAuthorization, AuthError> {
        let mut otp: Option<String> = None;
        loop {
            let exchange = self
                .post_authorization(username, secret, otp.as_deref())
                .await?;
            match exchange {
                ExchangeResponse::Authorized(authorization) => return Ok(authorization),
                ExchangeResponse::TwoFactor(delivery) => {
                    let reason = if otp.is_some() {
                        ChallengeReason::CodeRejected
                    } else {
                        ChallengeReason::CodeRequired { delivery }
                    };
                    debug!(host = %self.host, ?reason, "host demanded a one-time code");
                    match resolver.resolve(reason).await {
                        Ok(result) => otp = Some(result.code),
                        Err(_) => return Err(AuthError::Cancelled),
                    }
                }
            }
        }
    }

    async fn fetch_identity(
        &self,
        authorization: &ApplicationAuthorization,
    ) -> Result<IdentityRecord, AuthError> {
        let url = format!("{}/user", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .header(
                "Authorization",
                format!("token {}", authorization.token),
            )
            .send()
            .await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }
        if !response.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "identity request failed with status {}",
                response.status()
            )));
        }
        let payload: Map<String, Value> = response.json().await?;
        parse_identity(payload, self.host.is_enterprise())
    }
}

/// Default production factory: one [`HttpAuthClient`] per host.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpAuthClientFactory;

impl AuthClientFactory for HttpAuthClientFactory {
    fn create(&self, host: &HostAddress) -> Arc<dyn RemoteAuthClient> {
        Arc::new(HttpAuthClient::new(host.clone()))
    }
}

enum ExchangeResponse {
    Authorized(ApplicationAuthorization),
    TwoFactor(OtpDelivery),
}

async fn classify_exchange(response: Response) -> Result<ExchangeResponse, AuthError> {
    let status = response.status();
    if status.is_success() {
        let payload: AuthorizationResponse = response.json().await?;
        return Ok(ExchangeResponse::Authorized(ApplicationAuthorization {
            token: payload.token,
            scopes: payload.scopes,
        }));
    }
    if status == StatusCode::UNAUTHORIZED {
        if let Some(delivery) = parse_otp_header(&response) {
            return Ok(ExchangeResponse::TwoFactor(delivery));
        }
        return Err(AuthError::InvalidCredentials);
    }
    if status == StatusCode::FORBIDDEN {
        return Err(AuthError::InvalidCredentials);
    }
    Err(AuthError::InvalidResponse(format!(
        "credential exchange failed with status {status}"
    )))
}

fn parse_otp_header(response: &Response) -> Option<OtpDelivery> {
    let header = response.headers().get(OTP_HEADER)?.to_str().ok()?;
    let mut parts = header.split(';').map(str::trim);
    if !parts.next()?.eq_ignore_ascii_case("required") {
        return None;
    }
    let delivery = match parts.next().map(|d| d.to_ascii_lowercase()) {
        Some(ref d) if d == "app" => OtpDelivery::App,
        Some(ref d) if d == "sms" => OtpDelivery::Sms,
        _ => OtpDelivery::Unknown,
    };
    Some(delivery)
}

fn parse_identity(
    mut payload: Map<String, Value>,
    is_enterprise: bool,
) -> Result<IdentityRecord, AuthError> {
    let login = payload
        .remove("login")
        .and_then(|v| v.as_str().map(String::from))
        .ok_or_else(|| {
            AuthError::InvalidResponse("identity response missing login".to_string())
        })?;
    let display_name = payload
        .remove("name")
        .and_then(|v| v.as_str().map(String::from));
    let avatar_url = payload
        .remove("avatar_url")
        .and_then(|v| v.as_str().map(String::from));
    Ok(IdentityRecord {
        login,
        display_name,
        avatar_url,
        is_enterprise,
        raw: payload,
    })
}

#[derive(Debug, Deserialize)]
struct AuthorizationResponse {
    token: String,
    scopes: Option<Vec<String>>,
}
