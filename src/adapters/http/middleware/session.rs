use actix_web::{
  Error, FromRequest, HttpMessage, HttpRequest,
  cookie::{Cookie, SameSite, time::Duration as CookieDuration},
  dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::{
  collections::HashMap,
  future::{Ready, ready},
  ops::Deref,
  rc::Rc,
  sync::Arc,
};

use crate::{
  adapters::http::errors::{ApiError, AuthErrorKind},
  domain::auth::{
    cookies::{CookieJar, QueuedCookie},
    errors::AuthError,
    guard::Guard,
    ports::SessionRepository,
    services::AuthManager,
    session::SessionStore,
    value_objects::SessionId,
  },
  infrastructure::security::CookieEncrypter,
};

/// Session cookie settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
  pub cookie_name: String,
  pub lifetime: chrono::Duration,
  pub secure: bool,
}

/// Per-request authentication context stored in request extensions
#[derive(Clone)]
pub struct AuthContext {
  pub guard: Arc<dyn Guard>,
  pub session: SessionStore,
  pub cookies: CookieJar,
}

/// Loads the session, builds the request's guard, and persists both after
/// the handler ran.
///
/// Incoming cookies are decrypted with [`CookieEncrypter`]; a cookie that
/// fails to decrypt is treated as if it had not been sent. After the handler
/// returns, a dirty or previously persisted session is saved (refreshing its
/// TTL), a migrated-away session id is destroyed, and the session cookie and
/// any cookies queued by the guard are written encrypted.
///
/// # Example
///
/// ```no_run
/// use actix_web::{App, web};
/// use std::sync::Arc;
/// # use clinicguard::adapters::http::middleware::{SessionSettings, StartSession};
/// # use clinicguard::domain::auth::{AuthManager, ports::SessionRepository};
/// # use clinicguard::infrastructure::security::CookieEncrypter;
///
/// # fn example(
/// #   sessions: Arc<dyn SessionRepository>,
/// #   manager: Arc<AuthManager>,
/// #   encrypter: Arc<CookieEncrypter>,
/// #   settings: SessionSettings,
/// # ) {
/// let app = App::new()
///   .wrap(StartSession::new(sessions, manager, encrypter, settings))
///   .route("/", web::get().to(|| async { "ok" }));
/// # }
/// ```
pub struct StartSession {
  inner: Rc<SessionServices>,
}

struct SessionServices {
  sessions: Arc<dyn SessionRepository>,
  manager: Arc<AuthManager>,
  encrypter: Arc<CookieEncrypter>,
  settings: SessionSettings,
}

impl StartSession {
  pub fn new(
    sessions: Arc<dyn SessionRepository>,
    manager: Arc<AuthManager>,
    encrypter: Arc<CookieEncrypter>,
    settings: SessionSettings,
  ) -> Self {
    Self {
      inner: Rc::new(SessionServices {
        sessions,
        manager,
        encrypter,
        settings,
      }),
    }
  }
}

impl<S, B> Transform<S, ServiceRequest> for StartSession
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Transform = StartSessionService<S>;
  type InitError = ();
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ready(Ok(StartSessionService {
      service: Rc::new(service),
      inner: Rc::clone(&self.inner),
    }))
  }
}

pub struct StartSessionService<S> {
  service: Rc<S>,
  inner: Rc<SessionServices>,
}

impl<S, B> Service<ServiceRequest> for StartSessionService<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<B>;
  type Error = Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = Rc::clone(&self.service);
    let inner = Rc::clone(&self.inner);

    Box::pin(async move {
      let mut incoming = inner.decrypt_cookies(&req);
      let session_cookie = incoming.remove(&inner.settings.cookie_name);

      let session = inner
        .load_session(session_cookie)
        .await
        .map_err(ApiError::from)?;
      let cookies = CookieJar::new(incoming);
      let guard = inner.manager.guard(session.clone(), cookies.clone());

      req.extensions_mut().insert(AuthContext {
        guard,
        session: session.clone(),
        cookies: cookies.clone(),
      });

      let mut res = service.call(req).await?;

      inner
        .flush(&session, &cookies, &mut res)
        .await
        .map_err(ApiError::from)?;

      Ok(res)
    })
  }
}

impl SessionServices {
  fn decrypt_cookies(&self, req: &ServiceRequest) -> HashMap<String, String> {
    let Ok(cookies) = req.cookies() else {
      return HashMap::new();
    };

    cookies
      .iter()
      .filter_map(
        |cookie| match self.encrypter.decrypt(cookie.name(), cookie.value()) {
          Ok(value) => Some((cookie.name().to_string(), value)),
          Err(e) => {
            tracing::debug!("Ignoring cookie '{}': {}", cookie.name(), e);
            None
          }
        },
      )
      .collect()
  }

  async fn load_session(&self, cookie: Option<String>) -> Result<SessionStore, AuthError> {
    let Some(id) = cookie.and_then(|value| SessionId::parse(value).ok()) else {
      return Ok(SessionStore::start());
    };

    match self.sessions.load(&id).await? {
      Some(record) => Ok(SessionStore::from_record(record)),
      None => {
        tracing::debug!("Session cookie refers to an unknown or expired session");
        Ok(SessionStore::start())
      }
    }
  }

  async fn flush<B>(
    &self,
    session: &SessionStore,
    cookies: &CookieJar,
    res: &mut ServiceResponse<B>,
  ) -> Result<(), AuthError> {
    if let Some(previous) = session.previous_id() {
      self.sessions.destroy(&previous).await?;
    }

    // A fresh session nobody wrote to is not worth storing
    if session.is_dirty() || !session.is_new() {
      self
        .sessions
        .save(&session.to_record(), self.settings.lifetime)
        .await?;

      let value = session.id().as_str().to_string();
      let cookie = self.build_cookie(
        &self.settings.cookie_name,
        &value,
        Some(self.settings.lifetime),
      )?;
      add_cookie(res, &cookie)?;
    }

    for queued in cookies.queued() {
      let cookie = self.queued_cookie(&queued)?;
      add_cookie(res, &cookie)?;
    }

    Ok(())
  }

  fn queued_cookie(&self, queued: &QueuedCookie) -> Result<Cookie<'static>, AuthError> {
    if queued.is_removal() {
      let mut cookie = Cookie::build(queued.name.clone(), "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(self.settings.secure)
        .finish();
      cookie.make_removal();
      return Ok(cookie);
    }

    self.build_cookie(&queued.name, &queued.value, queued.lifetime)
  }

  fn build_cookie(
    &self,
    name: &str,
    value: &str,
    lifetime: Option<chrono::Duration>,
  ) -> Result<Cookie<'static>, AuthError> {
    let encrypted = self
      .encrypter
      .encrypt(name, value)
      .map_err(|e| AuthError::Encryption(e.to_string()))?;

    let mut cookie = Cookie::build(name.to_string(), encrypted)
      .path("/")
      .http_only(true)
      .same_site(SameSite::Lax)
      .secure(self.settings.secure)
      .finish();

    if let Some(lifetime) = lifetime {
      cookie.set_max_age(CookieDuration::seconds(lifetime.num_seconds()));
    }

    Ok(cookie)
  }
}

fn add_cookie<B>(res: &mut ServiceResponse<B>, cookie: &Cookie<'_>) -> Result<(), AuthError> {
  res
    .response_mut()
    .add_cookie(cookie)
    .map_err(|e| AuthError::Encryption(format!("Invalid cookie header: {}", e)))
}

/// Extractor for the request's guard.
///
/// Requires [`StartSession`]; without it extraction fails with 401.
#[derive(Clone)]
pub struct Auth(pub AuthContext);

impl Auth {
  pub fn guard(&self) -> Arc<dyn Guard> {
    self.0.guard.clone()
  }

  pub fn session(&self) -> &SessionStore {
    &self.0.session
  }
}

impl Deref for Auth {
  type Target = dyn Guard;

  fn deref(&self) -> &Self::Target {
    self.0.guard.as_ref()
  }
}

impl FromRequest for Auth {
  type Error = ApiError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    ready(auth_context(req).map(Auth).ok_or_else(|| {
      tracing::error!("Auth extractor used on a route without StartSession");
      ApiError::Auth(AuthErrorKind::Unauthenticated)
    }))
  }
}

/// The context stored by [`StartSession`], if the route is wrapped by it
pub fn auth_context(req: &impl HttpMessage) -> Option<AuthContext> {
  req.extensions().get::<AuthContext>().cloned()
}
