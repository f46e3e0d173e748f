use actix_web::HttpResponse;

use crate::adapters::http::{dtos::DashboardResponse, errors::ApiError, middleware::Auth};
use crate::application::auth::GetCurrentUserUseCase;

/// GET /dashboard, behind the redirecting `Authenticate`
pub async fn dashboard_handler(auth: Auth) -> Result<HttpResponse, ApiError> {
  let response = GetCurrentUserUseCase::new(auth.guard()).execute().await?;

  Ok(HttpResponse::Ok().json(DashboardResponse::from(response)))
}

pub async fn health_check() -> &'static str {
  "OK"
}
