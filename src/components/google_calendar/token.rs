use crate::error::{auth_error, Error, TabResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// Source of OAuth access tokens
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Request a token; `interactive` allows prompting the user
    async fn get_auth_token(&self, interactive: bool) -> TabResult<String>;
}

/// Holds the access token for the lifetime of a sign-in
pub struct Session {
    provider: Arc<dyn IdentityProvider>,
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            token: RwLock::new(None),
        }
    }

    /// Cached token, or a freshly requested interactive one
    pub async fn get_token(&self) -> TabResult<String> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                return Ok(token.clone());
            }
        }

        // Holding the write lock keeps concurrent callers from prompting twice
        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        let token = self.provider.get_auth_token(true).await?;
        if token.is_empty() {
            return Err(auth_error("Identity provider returned an empty token"));
        }

        info!("Obtained calendar access token");
        *slot = Some(token.clone());
        Ok(token)
    }

    pub async fn cached_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Forget the token; the next request prompts again
    pub async fn sign_out(&self) {
        info!("Signing out of calendar session");
        *self.token.write().await = None;
    }

    /// Drop a token the API rejected
    pub async fn invalidate(&self) {
        warn!("Access token rejected, clearing cached token");
        *self.token.write().await = None;
    }
}

/// Provider handing out a pre-issued token
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn get_auth_token(&self, _interactive: bool) -> TabResult<String> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Browser consent flow with the redirect caught on a loopback port
#[derive(Debug, Clone)]
pub struct LoopbackOAuthProvider {
    client_id: String,
    client_secret: String,
    redirect_port: u16,
    client: Client,
}

impl LoopbackOAuthProvider {
    pub fn new(client_id: String, client_secret: String, redirect_port: u16) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_port,
            client: Client::new(),
        }
    }

    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.redirect_port)
    }

    /// Consent page URL carrying `state`
    pub fn authorization_url(&self, state: &str) -> TabResult<Url> {
        Url::parse_with_params(
            AUTH_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri().as_str()),
                ("response_type", "code"),
                ("scope", CALENDAR_SCOPE),
                ("state", state),
            ],
        )
        .map_err(|e| auth_error(&format!("Failed to build authorization URL: {}", e)))
    }

    async fn wait_for_code(&self, server: tiny_http::Server, state: String) -> TabResult<String> {
        tokio::task::spawn_blocking(move || receive_callback(server, &state))
            .await
            .map_err(|e| auth_error(&format!("Callback listener failed: {}", e)))?
    }

    async fn exchange_code(&self, code: &str) -> TabResult<String> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri().as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| auth_error(&format!("Failed to exchange code: {}", e)))?;

        let status = response.status();
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error(&format!("Failed to parse token response: {}", e)))?;

        if !status.is_success() {
            return Err(auth_error(&format!(
                "Token endpoint returned HTTP {}: {} {}",
                status,
                body.error.unwrap_or_default(),
                body.error_description.unwrap_or_default()
            )));
        }

        body.access_token
            .ok_or_else(|| auth_error("Token response missing 'access_token' field"))
    }
}

#[async_trait]
impl IdentityProvider for LoopbackOAuthProvider {
    async fn get_auth_token(&self, interactive: bool) -> TabResult<String> {
        if !interactive {
            return Err(auth_error("User interaction required to sign in"));
        }

        let state = uuid::Uuid::new_v4().to_string();
        let auth_url = self.authorization_url(&state)?;

        // Listen before the browser opens; an already-consented account redirects at once
        let server = bind_callback(self.redirect_port)?;

        info!("Opening browser for Google Calendar authorization");
        if let Err(e) = webbrowser::open(auth_url.as_str()) {
            // The URL still works when pasted by hand
            warn!("Could not open browser ({}), visit {}", e, auth_url);
        }

        let code = self.wait_for_code(server, state).await?;
        debug!("Received authorization code");
        self.exchange_code(&code).await
    }
}

/// Start listening for the consent redirect on `port`
fn bind_callback(port: u16) -> TabResult<tiny_http::Server> {
    let server = tiny_http::Server::http(("127.0.0.1", port))
        .map_err(|e| auth_error(&format!("Failed to listen on port {}: {}", port, e)))?;
    info!("Waiting for authorization callback on port {}", port);
    Ok(server)
}

/// Block until the consent redirect arrives on `server`
fn receive_callback(server: tiny_http::Server, expected_state: &str) -> TabResult<String> {

    loop {
        let request = server.recv().map_err(Error::from)?;
        let url = request.url().to_string();

        // Browsers also ask for /favicon.ico and the like
        if !url.starts_with("/?") {
            let _ = request.respond(tiny_http::Response::from_string("").with_status_code(404));
            continue;
        }

        let outcome = parse_callback(&url, expected_state);
        let message = match &outcome {
            Ok(_) => "Authorization successful! You can close this window.",
            Err(_) => "Authorization failed. You can close this window.",
        };
        if let Err(e) = request.respond(tiny_http::Response::from_string(message)) {
            warn!("Failed to answer authorization callback: {}", e);
        }
        return outcome;
    }
}

/// Extract the authorization code from a redirect path such as `/?code=..&state=..`
pub fn parse_callback(path_and_query: &str, expected_state: &str) -> TabResult<String> {
    let url = Url::parse("http://localhost")
        .and_then(|base| base.join(path_and_query))
        .map_err(|e| auth_error(&format!("Malformed callback URL: {}", e)))?;
    let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

    if let Some(error) = params.get("error") {
        return Err(auth_error(&format!("Authorization denied: {}", error)));
    }

    match params.get("state") {
        Some(state) if state == expected_state => {}
        _ => return Err(auth_error("Callback state does not match")),
    }

    params
        .get("code")
        .cloned()
        .ok_or_else(|| auth_error("No authorization code found in callback"))
}
