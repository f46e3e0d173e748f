use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::auth::{
  GetAuthStatusResponse, GetCurrentUserResponse, LoginUserCommand, LoginUserResponse,
};
use crate::domain::auth::entities::StaffRole;

/// Request for staff login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
  #[validate(email(message = "Invalid email format"))]
  pub email: String,

  #[validate(length(min = 1, max = 128, message = "Password is required"))]
  pub password: String,

  /// Whether to issue a remember-me cookie
  #[serde(default)]
  pub remember_me: bool,
}

impl From<LoginRequest> for LoginUserCommand {
  fn from(request: LoginRequest) -> Self {
    Self {
      email: request.email,
      password: request.password,
      remember_me: request.remember_me,
    }
  }
}

/// Response after successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
  pub user_id: i64,
  pub email: String,
  pub full_name: String,
  pub role: StaffRole,
  /// True when a remember-me cookie was issued
  pub remembered: bool,
}

impl From<LoginUserResponse> for LoginResponse {
  fn from(response: LoginUserResponse) -> Self {
    Self {
      user_id: response.user_id.value(),
      email: response.email,
      full_name: response.full_name,
      role: response.role,
      remembered: response.remembered,
    }
  }
}

/// Response containing current user information
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUserResponse {
  pub user_id: i64,
  pub email: String,
  pub full_name: String,
  pub role: StaffRole,
  pub created_at: DateTime<Utc>,
  pub via_remember: bool,
}

impl From<GetCurrentUserResponse> for CurrentUserResponse {
  fn from(response: GetCurrentUserResponse) -> Self {
    Self {
      user_id: response.user_id.value(),
      email: response.email,
      full_name: response.full_name,
      role: response.role,
      created_at: response.created_at,
      via_remember: response.via_remember,
    }
  }
}

/// Authentication state of the current request
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatusResponse {
  pub guard: String,
  pub authenticated: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_id: Option<i64>,
  pub via_remember: bool,
}

impl From<GetAuthStatusResponse> for AuthStatusResponse {
  fn from(response: GetAuthStatusResponse) -> Self {
    Self {
      guard: response.guard,
      authenticated: response.authenticated,
      user_id: response.user_id.map(|id| id.value()),
      via_remember: response.via_remember,
    }
  }
}

/// Landing payload for the protected dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
  pub greeting: String,
  pub role: StaffRole,
  pub via_remember: bool,
}

impl From<GetCurrentUserResponse> for DashboardResponse {
  fn from(response: GetCurrentUserResponse) -> Self {
    Self {
      greeting: format!("Welcome back, {}", response.full_name),
      role: response.role,
      via_remember: response.via_remember,
    }
  }
}

/// Standard success response for operations without data
#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
  pub message: String,
}

/// Standard error response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
  /// Error type/code
  pub error: String,

  /// Human-readable error message
  pub message: String,

  /// Optional detailed error information
  #[serde(skip_serializing_if = "Option::is_none")]
  pub details: Option<serde_json::Value>,
}
