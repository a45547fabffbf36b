//! REST client for the auth and event endpoints.

use reqwest::{Client, header::AUTHORIZATION};
use url::Url;
use uuid::Uuid;

use super::{ClientError, parse_response};
use crate::objects::{
    AuthResponse, CreateEventRequest, EventResponse, LoginRequest, RegisterRequest, UserSummary,
};
use crate::token::BEARER_PREFIX;

/// Typed HTTP client for the Rally REST API.
///
/// Holds the bearer token of the last successful register, login, or guest
/// login and sends it on every protected call.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new `ApiClient` for the server rooted at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
            token: None,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Restore a previously issued token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Forget the stored token.
    pub fn logout(&mut self) {
        self.token = None;
    }

    fn bearer(&self) -> Result<String, ClientError> {
        self.token
            .as_ref()
            .map(|t| format!("{BEARER_PREFIX}{t}"))
            .ok_or(ClientError::NotLoggedIn)
    }

    fn remember(&mut self, auth: AuthResponse) -> AuthResponse {
        self.token = Some(auth.token.clone());
        auth
    }

    /// `POST /api/auth/register`
    pub async fn register(&mut self, body: &RegisterRequest) -> Result<AuthResponse, ClientError> {
        let url = self.base_url.join("/api/auth/register")?;
        let resp = self.http.post(url).json(body).send().await?;
        let auth = parse_response(resp).await?;
        Ok(self.remember(auth))
    }

    /// `POST /api/auth/login`
    pub async fn login(&mut self, body: &LoginRequest) -> Result<AuthResponse, ClientError> {
        let url = self.base_url.join("/api/auth/login")?;
        let resp = self.http.post(url).json(body).send().await?;
        let auth = parse_response(resp).await?;
        Ok(self.remember(auth))
    }

    /// `POST /api/auth/guest`
    pub async fn guest_login(&mut self) -> Result<AuthResponse, ClientError> {
        let url = self.base_url.join("/api/auth/guest")?;
        let resp = self.http.post(url).send().await?;
        let auth = parse_response(resp).await?;
        Ok(self.remember(auth))
    }

    /// `GET /api/auth/me`
    pub async fn me(&self) -> Result<UserSummary, ClientError> {
        let url = self.base_url.join("/api/auth/me")?;
        let resp = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `GET /api/events` – every event, sorted by date ascending.
    pub async fn list_events(&self) -> Result<Vec<EventResponse>, ClientError> {
        let url = self.base_url.join("/api/events")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `GET /api/events/{event_id}`
    pub async fn get_event(&self, event_id: Uuid) -> Result<EventResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/events/{event_id}"))?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }

    /// `POST /api/events`
    pub async fn create_event(
        &self,
        body: &CreateEventRequest,
    ) -> Result<EventResponse, ClientError> {
        let url = self.base_url.join("/api/events")?;
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.bearer()?)
            .json(body)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `POST /api/events/{event_id}/join`
    pub async fn join_event(&self, event_id: Uuid) -> Result<EventResponse, ClientError> {
        let url = self.base_url.join(&format!("/api/events/{event_id}/join"))?;
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        parse_response(resp).await
    }

    /// `DELETE /api/events/{event_id}`
    pub async fn delete_event(&self, event_id: Uuid) -> Result<(), ClientError> {
        let url = self.base_url.join(&format!("/api/events/{event_id}"))?;
        let resp = self
            .http
            .delete(url)
            .header(AUTHORIZATION, self.bearer()?)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, body });
        }
        Ok(())
    }
}
