//! HTTP implementation of the gateway.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::session::Credential;

use super::gateway::Gateway;
use super::types::{
  ApiErrorBody, AuthResponse, LoginRequest, PasswordUpdateRequest, RegisterRequest, Todo,
  TodoRequest, User,
};

/// Which route family a response came from; login rejections classify differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
  Login,
  Other,
}

/// Todo service client over `reqwest`.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base: Url,
  credential: Credential,
}

impl ApiClient {
  pub fn new(base_url: &str, credential: Credential) -> color_eyre::Result<Self> {
    // Url::join drops the last path segment unless the base ends with '/'
    let normalized = if base_url.ends_with('/') {
      base_url.to_string()
    } else {
      format!("{}/", base_url)
    };
    let base = Url::parse(&normalized)
      .map_err(|e| color_eyre::eyre::eyre!("Invalid server URL {}: {}", base_url, e))?;

    let client = Client::builder()
      .user_agent(concat!("taskdeck/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base,
      credential,
    })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn url(&self, path: &str) -> ApiResult<Url> {
    self
      .base
      .join(path)
      .map_err(|e| ApiError::server(format!("invalid request path {}: {}", path, e)))
  }

  async fn send<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: Option<&B>,
    route: Route,
  ) -> ApiResult<Vec<u8>> {
    let url = self.url(path)?;
    debug!(%method, path, "request");

    let mut request = self.client.request(method, url);
    if let Some(token) = self.credential.get() {
      request = request.bearer_auth(token);
    }
    if let Some(body) = body {
      request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
      let err = classify(status, &bytes, route);
      debug!(path, %status, kind = ?err.kind, "request failed");
      return Err(err);
    }

    Ok(bytes.to_vec())
  }

  async fn json<T: DeserializeOwned, B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: Option<&B>,
  ) -> ApiResult<T> {
    let bytes = self.send(method, path, body, Route::Other).await?;
    serde_json::from_slice(&bytes)
      .map_err(|e| ApiError::server(format!("failed to parse response from {}: {}", path, e)))
  }

  async fn unit<B: Serialize + ?Sized>(
    &self,
    method: Method,
    path: &str,
    body: Option<&B>,
  ) -> ApiResult<()> {
    self.send(method, path, body, Route::Other).await?;
    Ok(())
  }
}

/// Placeholder body type for requests without a payload.
const NO_BODY: Option<&()> = None;

#[async_trait]
impl Gateway for ApiClient {
  async fn login(&self, request: &LoginRequest) -> ApiResult<AuthResponse> {
    let bytes = self
      .send(Method::POST, "auth/login", Some(request), Route::Login)
      .await?;
    serde_json::from_slice(&bytes)
      .map_err(|e| ApiError::server(format!("failed to parse login response: {}", e)))
  }

  async fn register(&self, request: &RegisterRequest) -> ApiResult<()> {
    self.unit(Method::POST, "auth/register", Some(request)).await
  }

  async fn current_user(&self) -> ApiResult<User> {
    self.json(Method::GET, "users/info", NO_BODY).await
  }

  async fn change_password(&self, request: &PasswordUpdateRequest) -> ApiResult<()> {
    self.unit(Method::PUT, "users/password", Some(request)).await
  }

  async fn delete_account(&self) -> ApiResult<()> {
    self.unit(Method::DELETE, "users", NO_BODY).await
  }

  async fn list_todos(&self) -> ApiResult<Vec<Todo>> {
    self.json(Method::GET, "todos", NO_BODY).await
  }

  async fn create_todo(&self, request: &TodoRequest) -> ApiResult<Todo> {
    self.json(Method::POST, "todos", Some(request)).await
  }

  async fn toggle_todo(&self, id: i64) -> ApiResult<Todo> {
    self.json(Method::PUT, &format!("todos/{}", id), NO_BODY).await
  }

  async fn delete_todo(&self, id: i64) -> ApiResult<()> {
    self.unit(Method::DELETE, &format!("todos/{}", id), NO_BODY).await
  }

  async fn list_users(&self) -> ApiResult<Vec<User>> {
    self.json(Method::GET, "admin", NO_BODY).await
  }

  async fn promote_user(&self, id: i64) -> ApiResult<User> {
    self
      .json(Method::PUT, &format!("admin/{}/role", id), NO_BODY)
      .await
  }

  async fn delete_user(&self, id: i64) -> ApiResult<()> {
    self.unit(Method::DELETE, &format!("admin/{}", id), NO_BODY).await
  }
}

/// Turn a non-2xx response into a classified error.
fn classify(status: StatusCode, body: &[u8], route: Route) -> ApiError {
  let parsed: ApiErrorBody = serde_json::from_slice(body).unwrap_or_default();
  let message = if parsed.message.is_empty() {
    status
      .canonical_reason()
      .unwrap_or("request failed")
      .to_string()
  } else {
    parsed.message.clone()
  };

  if route == Route::Login
    && matches!(
      status,
      StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    )
  {
    return ApiError::authentication(message);
  }

  match status {
    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
      let (field, message) = match parsed.field {
        Some(field) => (Some(field), message),
        None => split_field(&message),
      };
      ApiError {
        kind: crate::error::ErrorKind::Validation,
        field,
        message,
      }
    }
    StatusCode::UNAUTHORIZED => ApiError::unauthorized(message),
    StatusCode::FORBIDDEN => ApiError::forbidden(message),
    StatusCode::NOT_FOUND => ApiError::not_found(message),
    _ => ApiError::server(format!("{} ({})", message, status.as_u16())),
  }
}

/// Split a `field: message` validation text into its parts.
fn split_field(message: &str) -> (Option<String>, String) {
  match message.split_once(": ") {
    Some((field, rest))
      if !field.is_empty() && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
    {
      (Some(field.to_string()), rest.to_string())
    }
    _ => (None, message.to_string()),
  }
}
