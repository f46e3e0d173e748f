use actix_web::{
  Error, HttpResponse, ResponseError,
  body::EitherBody,
  dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
  http::header::LOCATION,
};
use futures_util::future::LocalBoxFuture;
use std::{future::ready, rc::Rc};

use super::session::auth_context;
use crate::adapters::http::errors::{ApiError, AuthErrorKind};

/// What a guest receives from a protected route
#[derive(Debug, Clone)]
enum OnGuest {
  /// 401 with a JSON error body
  Reject,
  /// 302 to the login page
  Redirect(Rc<str>),
}

/// Rejects requests whose guard has no user.
///
/// Must be wrapped inside [`StartSession`](super::StartSession); a route
/// without a session is treated as a guest.
pub struct Authenticate {
  on_guest: OnGuest,
}

impl Authenticate {
  /// Protects JSON API routes
  pub fn api() -> Self {
    Self {
      on_guest: OnGuest::Reject,
    }
  }

  /// Protects browser routes, sending guests to `login_path`
  pub fn redirect(login_path: impl AsRef<str>) -> Self {
    Self {
      on_guest: OnGuest::Redirect(Rc::from(login_path.as_ref())),
    }
  }
}

impl<S, B> Transform<S, ServiceRequest> for Authenticate
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type InitError = ();
  type Transform = AuthenticateService<S>;
  type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ready(Ok(AuthenticateService {
      service: Rc::new(service),
      on_guest: self.on_guest.clone(),
    }))
  }
}

pub struct AuthenticateService<S> {
  service: Rc<S>,
  on_guest: OnGuest,
}

impl<S, B> Service<ServiceRequest> for AuthenticateService<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = Rc::clone(&self.service);
    let on_guest = self.on_guest.clone();

    Box::pin(async move {
      let authenticated = match auth_context(&req) {
        Some(context) => context.guard.check().await.map_err(ApiError::from)?,
        None => {
          tracing::warn!("Protected route {} is not wrapped by StartSession", req.path());
          false
        }
      };

      if authenticated {
        let res = service.call(req).await?;
        return Ok(res.map_into_left_body());
      }

      tracing::debug!("Guest request to protected route {}", req.path());

      let response = match on_guest {
        OnGuest::Reject => ApiError::Auth(AuthErrorKind::Unauthenticated).error_response(),
        OnGuest::Redirect(login_path) => HttpResponse::Found()
          .insert_header((LOCATION, login_path.as_ref()))
          .finish(),
      };

      Ok(req.into_response(response).map_into_right_body())
    })
  }
}
