//! Client-side input checks, run before any request is sent.
//!
//! The bounds mirror what the server enforces; a request that fails here is
//! never submitted. Failures are `Validation` errors naming the field.

use std::ops::RangeInclusive;

use crate::api::types::{LoginRequest, PasswordUpdateRequest, RegisterRequest, TodoRequest};
use crate::error::{ApiError, ApiResult};

pub const TITLE_LEN: RangeInclusive<usize> = 3..=30;
pub const DESCRIPTION_LEN: RangeInclusive<usize> = 3..=120;
pub const PRIORITY: RangeInclusive<u8> = 1..=5;
pub const NAME_LEN: RangeInclusive<usize> = 3..=30;
pub const PASSWORD_LEN: RangeInclusive<usize> = 5..=30;

fn check_len(field: &str, value: &str, bounds: RangeInclusive<usize>) -> ApiResult<()> {
  let len = value.trim().chars().count();
  if bounds.contains(&len) {
    Ok(())
  } else {
    Err(ApiError::validation(
      field,
      format!(
        "{} must be between {} and {} characters",
        field,
        bounds.start(),
        bounds.end()
      ),
    ))
  }
}

fn check_email(value: &str) -> ApiResult<()> {
  let value = value.trim();
  if value.is_empty() {
    return Err(ApiError::validation("email", "email is required"));
  }
  Ok(())
}

pub fn validate_todo(request: &TodoRequest) -> ApiResult<()> {
  check_len("title", &request.title, TITLE_LEN)?;
  check_len("description", &request.description, DESCRIPTION_LEN)?;
  if !PRIORITY.contains(&request.priority) {
    return Err(ApiError::validation(
      "priority",
      format!(
        "priority must be between {} and {}",
        PRIORITY.start(),
        PRIORITY.end()
      ),
    ));
  }
  Ok(())
}

pub fn validate_login(request: &LoginRequest) -> ApiResult<()> {
  check_email(&request.email)?;
  check_len("password", &request.password, PASSWORD_LEN)
}

pub fn validate_register(request: &RegisterRequest) -> ApiResult<()> {
  check_len("firstName", &request.first_name, NAME_LEN)?;
  check_len("lastName", &request.last_name, NAME_LEN)?;
  check_email(&request.email)?;
  if !request.email.contains('@') {
    return Err(ApiError::validation("email", "email address is not valid"));
  }
  check_len("password", &request.password, PASSWORD_LEN)
}

pub fn validate_password_change(request: &PasswordUpdateRequest) -> ApiResult<()> {
  check_len("oldPassword", &request.old_password, PASSWORD_LEN)?;
  check_len("newPassword", &request.new_password, PASSWORD_LEN)?;
  check_len("newPassword2", &request.new_password2, PASSWORD_LEN)?;
  if request.new_password != request.new_password2 {
    return Err(ApiError::validation("newPassword2", "passwords do not match"));
  }
  Ok(())
}
