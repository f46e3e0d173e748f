use actix_web::{HttpResponse, web};
use validator::Validate;

use crate::adapters::http::{
  dtos::{AuthStatusResponse, CurrentUserResponse, LoginRequest, LoginResponse, SuccessResponse},
  errors::ApiError,
  middleware::Auth,
};
use crate::application::auth::{
  GetAuthStatusUseCase, GetCurrentUserUseCase, LoginUserUseCase, LogoutUserUseCase,
};

/// Handler for staff login
///
/// POST /api/v1/auth/login
/// Body: LoginRequest (JSON)
/// Response: LoginResponse (JSON) with status 200, session cookie set
pub async fn login_handler(
  auth: Auth,
  request: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
  request.validate()?;

  let response = LoginUserUseCase::new(auth.guard())
    .execute(request.into_inner().into())
    .await?;

  Ok(HttpResponse::Ok().json(LoginResponse::from(response)))
}

/// Handler for logout
///
/// POST /api/v1/auth/logout
/// Response: SuccessResponse (JSON) with status 200, remember cookie removed
pub async fn logout_handler(auth: Auth) -> Result<HttpResponse, ApiError> {
  LogoutUserUseCase::new(auth.guard()).execute().await?;

  Ok(HttpResponse::Ok().json(SuccessResponse {
    message: "Successfully logged out".to_string(),
  }))
}

/// Handler for getting current user information
///
/// GET /api/v1/auth/me
/// Response: CurrentUserResponse (JSON) with status 200
pub async fn me_handler(auth: Auth) -> Result<HttpResponse, ApiError> {
  let response = GetCurrentUserUseCase::new(auth.guard()).execute().await?;

  Ok(HttpResponse::Ok().json(CurrentUserResponse::from(response)))
}

/// GET /api/v1/auth/status
pub async fn status_handler(auth: Auth) -> Result<HttpResponse, ApiError> {
  let response = GetAuthStatusUseCase::new(auth.guard()).execute().await?;

  Ok(HttpResponse::Ok().json(AuthStatusResponse::from(response)))
}
