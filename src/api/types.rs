//! Serde types matching the todo service's JSON bodies.

use serde::{Deserialize, Serialize};

/// Authority marker that confers admin capability.
pub const ROLE_ADMIN: &str = "ROLE_ADMIN";

/// A single todo item, owned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
  pub id: i64,
  pub title: String,
  pub description: String,
  pub priority: u8,
  pub complete: bool,
}

/// Named capability granted to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
  pub authority: String,
}

impl Authority {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      authority: name.into(),
    }
  }
}

/// A user account, as returned by `/users/info` and `/admin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: i64,
  pub full_name: String,
  pub email: String,
  #[serde(default)]
  pub authorities: Vec<Authority>,
}

impl User {
  pub fn has_authority(&self, name: &str) -> bool {
    self.authorities.iter().any(|a| a.authority == name)
  }

  pub fn is_admin(&self) -> bool {
    self.has_authority(ROLE_ADMIN)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
  pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub password: String,
}

/// Payload for creating a todo. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoRequest {
  pub title: String,
  pub description: String,
  pub priority: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordUpdateRequest {
  pub old_password: String,
  pub new_password: String,
  pub new_password2: String,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
  #[serde(default)]
  pub status: u16,
  #[serde(default)]
  pub message: String,
  /// Some validation responses name the field explicitly
  pub field: Option<String>,
  pub time_stamp: Option<i64>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_user_deserializes_camel_case() {
    let json = r#"{
      "id": 7,
      "fullName": "Ada Lovelace",
      "email": "ada@example.com",
      "authorities": [{"authority": "ROLE_USER"}, {"authority": "ROLE_ADMIN"}]
    }"#;
    let user: User = serde_json::from_str(json).unwrap();
    assert_eq!(user.full_name, "Ada Lovelace");
    assert!(user.is_admin());
    assert!(user.has_authority("ROLE_USER"));
  }

  #[test]
  fn test_user_without_authorities_is_standard() {
    let json = r#"{"id": 1, "fullName": "Bob", "email": "bob@example.com"}"#;
    let user: User = serde_json::from_str(json).unwrap();
    assert!(!user.is_admin());
  }

  #[test]
  fn test_password_request_field_names() {
    let req = PasswordUpdateRequest {
      old_password: "old-secret".into(),
      new_password: "new-secret".into(),
      new_password2: "new-secret".into(),
    };
    let value = serde_json::to_value(req).unwrap();
    assert_eq!(value["oldPassword"], "old-secret");
    assert_eq!(value["newPassword2"], "new-secret");
  }

  #[test]
  fn test_error_body_tolerates_missing_fields() {
    let body: ApiErrorBody = serde_json::from_str(r#"{"message": "nope"}"#).unwrap();
    assert_eq!(body.status, 0);
    assert_eq!(body.message, "nope");
    assert!(body.field.is_none());
  }
}
