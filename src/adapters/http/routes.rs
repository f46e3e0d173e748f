use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::web;

use crate::infrastructure::config::RateLimitConfig;

use super::handlers::{
  dashboard_handler, health_check, login_handler, logout_handler, me_handler, status_handler,
};
use super::middleware::Authenticate;

/// Configure authentication routes
///
/// Mounts the authentication endpoints under the provided scope
/// (e.g., /api/v1/auth). Requires `StartSession` on an enclosing scope.
///
/// # Routes
///
/// - POST /login - Attempt a login, optionally issuing a remember cookie
/// - POST /logout - Log out and forget the remember cookie
/// - GET /me - Current user information (401 for guests)
/// - GET /status - Whether the request is authenticated
///
/// Login is rate limited per peer IP.
///
/// # Example
///
/// ```no_run
/// use actix_web::{App, web};
/// # use clinicguard::adapters::http::routes::configure_auth_routes;
/// # use clinicguard::infrastructure::config::RateLimitConfig;
///
/// # fn example(rate_limit: RateLimitConfig) {
/// let app = App::new().service(
///   web::scope("/api/v1/auth").configure(|cfg| configure_auth_routes(cfg, &rate_limit)),
/// );
/// # }
/// ```
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig, rate_limit: &RateLimitConfig) {
  let login = web::resource("/login").route(web::post().to(login_handler));

  let governor = GovernorConfigBuilder::default()
    .seconds_per_request(rate_limit.login_seconds_per_request)
    .burst_size(rate_limit.login_burst_size)
    .finish();

  match governor {
    Some(governor) => cfg.service(login.wrap(Governor::new(&governor))),
    None => {
      tracing::warn!("Login rate limit disabled: burst size and period must be non-zero");
      cfg.service(login)
    }
  };

  cfg
    .route("/logout", web::post().to(logout_handler))
    .service(
      web::resource("/me")
        .wrap(Authenticate::api())
        .route(web::get().to(me_handler)),
    )
    .route("/status", web::get().to(status_handler));
}

/// Configure browser-facing routes
///
/// Guests hitting the dashboard are redirected to `login_path`.
pub fn configure_web_routes(cfg: &mut web::ServiceConfig, login_path: &str) {
  cfg
    .service(
      web::resource("/dashboard")
        .wrap(Authenticate::redirect(login_path))
        .route(web::get().to(dashboard_handler)),
    )
    .route("/health", web::get().to(health_check));
}

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::{
    App,
    cookie::{Cookie, time::Duration as CookieDuration},
    dev::ServiceResponse,
    http::{StatusCode, header},
    test,
  };
  use base64::{Engine as _, engine::general_purpose::STANDARD};
  use serde_json::{Value, json};
  use std::net::SocketAddr;
  use std::sync::Arc;

  use crate::adapters::http::middleware::{SessionSettings, StartSession};
  use crate::domain::auth::{
    AuthEvent, AuthManager, AuthManagerConfig, SessionId, SessionStore, StaffRole, User, UserId,
    guard::recaller_name, ports::SessionRepository,
  };
  use crate::infrastructure::events::MemoryEventDispatcher;
  use crate::infrastructure::persistence::memory::{MemorySessionRepository, MemoryUserProvider};
  use crate::infrastructure::security::{CookieEncrypter, SecureTokenGenerator};

  const SESSION_COOKIE: &str = "clinicguard_session";
  const EMAIL: &str = "charge.nurse@example.org";
  const PASSWORD: &str = "night-shift-2024";

  struct Harness {
    sessions: Arc<MemorySessionRepository>,
    provider: Arc<MemoryUserProvider>,
    events: Arc<MemoryEventDispatcher>,
    manager: Arc<AuthManager>,
    encrypter: Arc<CookieEncrypter>,
    rate_limit: RateLimitConfig,
  }

  impl Harness {
    fn new() -> Self {
      let provider = Arc::new(MemoryUserProvider::new());
      provider
        .insert(
          User::new(
            UserId::new(21).unwrap(),
            EMAIL.to_string(),
            "Charge Nurse".to_string(),
            StaffRole::Nurse,
          ),
          PASSWORD,
        )
        .unwrap();

      let events = Arc::new(MemoryEventDispatcher::new());
      let manager = Arc::new(AuthManager::new(
        provider.clone(),
        Arc::new(SecureTokenGenerator::new()),
        events.clone(),
        AuthManagerConfig::default(),
      ));

      Self {
        sessions: Arc::new(MemorySessionRepository::new()),
        provider,
        events,
        manager,
        encrypter: Arc::new(CookieEncrypter::new(&STANDARD.encode([42u8; 32])).unwrap()),
        rate_limit: RateLimitConfig {
          login_burst_size: 3,
          login_seconds_per_request: 60,
        },
      }
    }

    fn start_session(&self) -> StartSession {
      StartSession::new(
        self.sessions.clone(),
        self.manager.clone(),
        self.encrypter.clone(),
        SessionSettings {
          cookie_name: SESSION_COOKIE.to_string(),
          lifetime: chrono::Duration::hours(2),
          secure: false,
        },
      )
    }

    fn encrypted_cookie(&self, name: &str, value: &str) -> Cookie<'static> {
      Cookie::new(name.to_string(), self.encrypter.encrypt(name, value).unwrap())
    }

    fn decrypt(&self, cookie: &Cookie<'_>) -> String {
      self.encrypter.decrypt(cookie.name(), cookie.value()).unwrap()
    }
  }

  macro_rules! app {
    ($harness:expr) => {
      test::init_service(
        App::new()
          .wrap($harness.start_session())
          .service(
            web::scope("/api/v1/auth")
              .configure(|cfg| configure_auth_routes(cfg, &$harness.rate_limit)),
          )
          .configure(|cfg| configure_web_routes(cfg, "/login")),
      )
      .await
    };
  }

  fn peer() -> SocketAddr {
    "10.0.0.7:51000".parse().unwrap()
  }

  fn login_request(password: &str, remember_me: bool) -> test::TestRequest {
    test::TestRequest::post()
      .uri("/api/v1/auth/login")
      .peer_addr(peer())
      .set_json(json!({
        "email": EMAIL,
        "password": password,
        "remember_me": remember_me,
      }))
  }

  fn cookies_of<B>(res: &ServiceResponse<B>) -> Vec<Cookie<'static>> {
    res
      .response()
      .cookies()
      .map(|cookie| cookie.into_owned())
      .collect()
  }

  fn find(cookies: &[Cookie<'static>], name: &str) -> Option<Cookie<'static>> {
    cookies.iter().find(|cookie| cookie.name() == name).cloned()
  }

  fn with_cookies(request: test::TestRequest, cookies: &[Cookie<'static>]) -> test::TestRequest {
    cookies
      .iter()
      .fold(request, |request, cookie| request.cookie(cookie.clone()))
  }

  #[actix_web::test]
  async fn test_health_check() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(test::read_body(res).await, "OK");
  }

  #[actix_web::test]
  async fn test_guest_request_stores_nothing() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/auth/status")
        .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookies_of(&res).is_empty());
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["authenticated"], false);
    assert_eq!(body["guard"], "web");
    assert!(harness.sessions.is_empty());
  }

  #[actix_web::test]
  async fn test_login_then_me_with_session_cookie() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, login_request(PASSWORD, false).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = cookies_of(&res);
    let session_cookie = find(&cookies, SESSION_COOKIE).unwrap();
    assert!(session_cookie.http_only().unwrap_or(false));
    assert!(find(&cookies, &recaller_name("web")).is_none());
    assert_ne!(
      session_cookie.value(),
      harness.decrypt(&session_cookie),
      "session cookie must be encrypted"
    );

    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["user_id"], 21);
    assert_eq!(body["role"], "nurse");
    assert_eq!(body["remembered"], false);

    let res = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .cookie(session_cookie)
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["email"], EMAIL);
    assert_eq!(body["via_remember"], false);
  }

  #[actix_web::test]
  async fn test_login_with_bad_password() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, login_request("not-the-password", false).to_request()).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert!(cookies_of(&res).is_empty());
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "invalid_credentials");
    assert!(matches!(
      harness.events.events().last(),
      Some(AuthEvent::Failed { .. })
    ));
  }

  #[actix_web::test]
  async fn test_login_validation_error() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(
      &app,
      test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(peer())
        .set_json(json!({"email": "not-an-email", "password": "x"}))
        .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "validation_error");
  }

  #[actix_web::test]
  async fn test_me_rejects_guest_with_json() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(
      &app,
      test::TestRequest::get().uri("/api/v1/auth/me").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["error"], "unauthenticated");
  }

  #[actix_web::test]
  async fn test_dashboard_redirects_guest_to_login() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(
      &app,
      test::TestRequest::get().uri("/dashboard").to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
      res.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
      "/login"
    );
  }

  #[actix_web::test]
  async fn test_dashboard_for_logged_in_user() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, login_request(PASSWORD, false).to_request()).await;
    let cookies = cookies_of(&res);

    let res = test::call_service(
      &app,
      with_cookies(test::TestRequest::get().uri("/dashboard"), &cookies).to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["greeting"], "Welcome back, Charge Nurse");
  }

  #[actix_web::test]
  async fn test_remember_cookie_restores_user_without_session() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, login_request(PASSWORD, true).to_request()).await;
    assert_eq!(res.status(), StatusCode::OK);

    let cookies = cookies_of(&res);
    let recaller = find(&cookies, &recaller_name("web")).unwrap();
    assert!(recaller.max_age().unwrap() > CookieDuration::days(29));
    assert!(harness.decrypt(&recaller).starts_with("21|"));
    assert!(harness.provider.remember_token_hash(UserId::new(21).unwrap()).is_some());

    // A new browser session: only the remember cookie survives
    let res = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .cookie(recaller)
        .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert!(find(&cookies_of(&res), SESSION_COOKIE).is_some());
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["user_id"], 21);
    assert_eq!(body["via_remember"], true);
  }

  #[actix_web::test]
  async fn test_logout_forgets_recaller_and_cycles_token() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, login_request(PASSWORD, true).to_request()).await;
    let cookies = cookies_of(&res);
    let recaller = find(&cookies, &recaller_name("web")).unwrap();

    let res = test::call_service(
      &app,
      with_cookies(test::TestRequest::post().uri("/api/v1/auth/logout"), &cookies).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let removal = find(&cookies_of(&res), &recaller_name("web")).unwrap();
    assert_eq!(removal.value(), "");
    assert_eq!(removal.max_age(), Some(CookieDuration::ZERO));

    // Neither the old session nor the stolen remember cookie works any more
    let res = test::call_service(
      &app,
      with_cookies(test::TestRequest::get().uri("/api/v1/auth/me"), &cookies).to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/auth/me")
        .cookie(recaller)
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  }

  #[actix_web::test]
  async fn test_tampered_cookies_count_as_absent() {
    let harness = Harness::new();
    let app = app!(harness);

    let res = test::call_service(&app, login_request(PASSWORD, true).to_request()).await;
    let cookies = cookies_of(&res);
    let session_cookie = find(&cookies, SESSION_COOKIE).unwrap();

    // Valid ciphertext moved to another cookie name fails authentication
    let swapped = Cookie::new(recaller_name("web"), session_cookie.value().to_string());
    let forged = Cookie::new(SESSION_COOKIE, "bm90LWEtdmFsaWQtY2lwaGVydGV4dA");

    let res = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/auth/status")
        .cookie(swapped)
        .cookie(forged)
        .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = test::read_body_json(res).await;
    assert_eq!(body["authenticated"], false);
  }

  #[actix_web::test]
  async fn test_login_migrates_existing_session() {
    let harness = Harness::new();
    let app = app!(harness);

    let existing = SessionStore::start();
    existing.put("ward", "4B").unwrap();
    harness
      .sessions
      .save(&existing.to_record(), chrono::Duration::hours(1))
      .await
      .unwrap();
    let old_id = existing.id();

    let res = test::call_service(
      &app,
      login_request(PASSWORD, false)
        .cookie(harness.encrypted_cookie(SESSION_COOKIE, old_id.as_str()))
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let session_cookie = find(&cookies_of(&res), SESSION_COOKIE).unwrap();
    let new_id = SessionId::parse(harness.decrypt(&session_cookie)).unwrap();
    assert_ne!(new_id, old_id);

    assert!(harness.sessions.load(&old_id).await.unwrap().is_none());
    let record = harness.sessions.load(&new_id).await.unwrap().unwrap();
    assert_eq!(record.attributes.get("ward"), Some(&json!("4B")));
  }

  #[actix_web::test]
  async fn test_login_is_rate_limited_per_peer() {
    let harness = Harness::new();
    let app = app!(harness);

    for _ in 0..harness.rate_limit.login_burst_size {
      let res = test::call_service(&app, login_request("wrong-password", false).to_request()).await;
      assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    let res = test::call_service(&app, login_request(PASSWORD, false).to_request()).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    // Status is not limited
    let res = test::call_service(
      &app,
      test::TestRequest::get()
        .uri("/api/v1/auth/status")
        .peer_addr(peer())
        .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
  }
}
