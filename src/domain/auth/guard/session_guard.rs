use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use std::sync::Arc;

use super::{Cached, Guard, GuardState, login_key, recaller_name};
use crate::domain::auth::cookies::{CookieJar, QueuedCookie};
use crate::domain::auth::entities::User;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::events::AuthEvent;
use crate::domain::auth::ports::{AuthEventDispatcher, TokenGenerator, UserProvider, UserResolver};
use crate::domain::auth::session::SessionStore;
use crate::domain::auth::value_objects::{Credentials, Recaller, RememberToken, UserId};

/// Shared services a [`SessionGuard`] is built from
#[derive(Clone)]
pub struct SessionGuardDependencies {
  pub provider: Arc<dyn UserProvider>,
  pub resolver: Arc<dyn UserResolver>,
  pub token_generator: Arc<dyn TokenGenerator>,
  pub events: Arc<dyn AuthEventDispatcher>,
}

/// Session-backed guard with a remember-cookie fallback.
///
/// Resolution order for [`Guard::user`]:
/// 1. the cached user, unless the request already logged out;
/// 2. the identifier under [`login_key`], handed to the injected
///    [`UserResolver`];
/// 3. the recaller cookie, checked against the provider's remember token.
///
/// Nothing is cached when every path misses, so a later call in the same
/// request sees session changes.
pub struct SessionGuard {
  name: String,
  login_key: String,
  recaller_name: String,
  session: SessionStore,
  cookies: CookieJar,
  provider: Arc<dyn UserProvider>,
  resolver: Arc<dyn UserResolver>,
  token_generator: Arc<dyn TokenGenerator>,
  events: Arc<dyn AuthEventDispatcher>,
  remember_ttl: Duration,
  state: Mutex<GuardState>,
}

impl SessionGuard {
  pub fn new(
    name: impl Into<String>,
    session: SessionStore,
    cookies: CookieJar,
    deps: SessionGuardDependencies,
    remember_ttl: Duration,
  ) -> Self {
    let name = name.into();
    Self {
      login_key: login_key(&name),
      recaller_name: recaller_name(&name),
      name,
      session,
      cookies,
      provider: deps.provider,
      resolver: deps.resolver,
      token_generator: deps.token_generator,
      events: deps.events,
      remember_ttl,
      state: Mutex::new(GuardState::default()),
    }
  }

  pub fn login_key(&self) -> &str {
    &self.login_key
  }

  pub fn recaller_name(&self) -> &str {
    &self.recaller_name
  }

  pub fn session(&self) -> &SessionStore {
    &self.session
  }

  pub fn cookies(&self) -> &CookieJar {
    &self.cookies
  }

  /// Looks the user up by id and logs them in
  pub async fn login_using_id(&self, id: UserId, remember: bool) -> Result<Option<User>, AuthError> {
    match self.provider.retrieve_by_id(id).await? {
      Some(user) => {
        self.login(user.clone(), remember).await?;
        Ok(Some(user))
      }
      None => Ok(None),
    }
  }

  fn recaller(&self) -> Option<Recaller> {
    self
      .cookies
      .get(&self.recaller_name)
      .and_then(|value| Recaller::parse(&value))
  }

  async fn user_from_session(&self) -> Result<Option<User>, AuthError> {
    let Some(id) = self.session.get::<UserId>(&self.login_key) else {
      return Ok(None);
    };

    let user = self.resolver.resolve(id, &self.session).await?;

    if let Some(user) = &user {
      self.events.dispatch(AuthEvent::Authenticated {
        guard: self.name.clone(),
        user_id: user.id,
      });
    }

    Ok(user)
  }

  async fn user_from_recaller(&self) -> Result<Option<User>, AuthError> {
    let Some(recaller) = self.recaller() else {
      return Ok(None);
    };

    let Some(user) = self
      .provider
      .retrieve_by_token(recaller.id(), recaller.token())
      .await?
    else {
      tracing::debug!(
        "Remember cookie for user {} did not match a stored token",
        recaller.id()
      );
      return Ok(None);
    };

    self.update_session(user.id)?;
    self.resolver.on_login(&user, &self.session)?;
    self.state.lock().via_remember = true;

    self.events.dispatch(AuthEvent::Login {
      guard: self.name.clone(),
      user_id: user.id,
      remember: true,
    });

    tracing::info!("Restored user {} from remember cookie", user.id);
    Ok(Some(user))
  }

  /// Stores the identifier and moves the session to a fresh id
  fn update_session(&self, id: UserId) -> Result<(), AuthError> {
    self.session.put(&self.login_key, id)?;
    self.session.migrate();
    Ok(())
  }

  async fn cycle_remember_token(&self, id: UserId) -> Result<RememberToken, AuthError> {
    let token = self.token_generator.generate().await?;
    self.provider.update_remember_token(id, &token).await?;
    Ok(token)
  }

  fn queue_recaller_cookie(&self, id: UserId, token: RememberToken) {
    let recaller = Recaller::new(id, token);
    self.cookies.queue(QueuedCookie::new(
      self.recaller_name.clone(),
      recaller.to_cookie_value(),
      self.remember_ttl,
    ));
  }

  fn has_recaller_cookie(&self) -> bool {
    self.cookies.get(&self.recaller_name).is_some()
      || self
        .cookies
        .queued()
        .iter()
        .any(|cookie| cookie.name == self.recaller_name && !cookie.is_removal())
  }

  async fn has_valid_credentials(
    &self,
    user: Option<&User>,
    credentials: &Credentials,
  ) -> Result<bool, AuthError> {
    let Some(user) = user else {
      return Ok(false);
    };

    let valid = self.provider.validate_credentials(user, credentials).await?;

    if valid {
      self.events.dispatch(AuthEvent::Validated {
        guard: self.name.clone(),
        user_id: user.id,
      });
    }

    Ok(valid)
  }
}

#[async_trait]
impl Guard for SessionGuard {
  fn name(&self) -> &str {
    &self.name
  }

  async fn user(&self) -> Result<Option<User>, AuthError> {
    let cached = self.state.lock().cached();
    match cached {
      Cached::LoggedOut => return Ok(None),
      Cached::User(user) => return Ok(Some(user)),
      Cached::Unresolved => {}
    }

    let mut user = self.user_from_session().await?;

    if user.is_none() {
      user = self.user_from_recaller().await?;
    }

    if let Some(user) = &user {
      self.state.lock().user = Some(user.clone());
    }

    Ok(user)
  }

  async fn validate(&self, credentials: &Credentials) -> Result<bool, AuthError> {
    let user = self.provider.retrieve_by_credentials(credentials).await?;
    self.has_valid_credentials(user.as_ref(), credentials).await
  }

  async fn attempt(&self, credentials: &Credentials, remember: bool) -> Result<bool, AuthError> {
    self.events.dispatch(AuthEvent::Attempting {
      guard: self.name.clone(),
      email: credentials.email.as_str().to_string(),
      remember,
    });

    let user = self.provider.retrieve_by_credentials(credentials).await?;

    if self.has_valid_credentials(user.as_ref(), credentials).await? {
      if let Some(user) = user {
        self.login(user, remember).await?;
        return Ok(true);
      }
    }

    self.events.dispatch(AuthEvent::Failed {
      guard: self.name.clone(),
      email: credentials.email.as_str().to_string(),
      user_id: user.map(|user| user.id),
    });

    Ok(false)
  }

  fn set_user(&self, user: User) {
    self.state.lock().set_user(user);
  }

  fn has_user(&self) -> bool {
    self.state.lock().user.is_some()
  }

  async fn login(&self, user: User, remember: bool) -> Result<(), AuthError> {
    self.update_session(user.id)?;
    self.resolver.on_login(&user, &self.session)?;

    if remember {
      let token = self.cycle_remember_token(user.id).await?;
      self.queue_recaller_cookie(user.id, token);
    }

    self.events.dispatch(AuthEvent::Login {
      guard: self.name.clone(),
      user_id: user.id,
      remember,
    });

    tracing::info!("User {} logged in (remember={})", user.id, remember);

    let mut state = self.state.lock();
    state.set_user(user);
    state.via_remember = false;
    state.issued_recaller = remember;
    Ok(())
  }

  async fn logout(&self) -> Result<(), AuthError> {
    let user = self.user().await?;

    self.session.remove(&self.login_key);
    self.resolver.on_logout(&self.session);

    if self.has_recaller_cookie() {
      self.cookies.forget(&self.recaller_name);
    }

    // Invalidates remember cookies issued before this logout
    if let Some(user) = &user {
      self.cycle_remember_token(user.id).await?;
    }

    self.events.dispatch(AuthEvent::Logout {
      guard: self.name.clone(),
      user_id: user.as_ref().map(|user| user.id),
    });

    if let Some(user) = &user {
      tracing::info!("User {} logged out", user.id);
    }

    self.state.lock().log_out();
    Ok(())
  }

  fn via_remember(&self) -> bool {
    self.state.lock().via_remember
  }

  fn issued_recaller(&self) -> bool {
    self.state.lock().issued_recaller
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::auth::entities::StaffRole;
  use crate::domain::auth::resolvers::{ProviderResolver, SessionStateResolver};
  use crate::domain::auth::session::{AUTH_LOGIN_KEY, AUTH_USER_KEY};
  use crate::domain::auth::value_objects::{Email, Password};
  use crate::infrastructure::events::MemoryEventDispatcher;
  use crate::infrastructure::persistence::memory::MemoryUserProvider;
  use crate::infrastructure::security::SecureTokenGenerator;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};

  const PASSWORD: &str = "night-shift-42";

  struct Fixture {
    provider: Arc<MemoryUserProvider>,
    events: Arc<MemoryEventDispatcher>,
    user: User,
  }

  impl Fixture {
    fn new() -> Self {
      let provider = Arc::new(MemoryUserProvider::new());
      let user = provider
        .insert(
          User::new(
            UserId::new(42).unwrap(),
            "charge.nurse@example.org".to_string(),
            "Charge Nurse".to_string(),
            StaffRole::Nurse,
          ),
          PASSWORD,
        )
        .unwrap();

      Self {
        provider,
        events: Arc::new(MemoryEventDispatcher::new()),
        user,
      }
    }

    fn deps(&self, resolver: Arc<dyn UserResolver>) -> SessionGuardDependencies {
      SessionGuardDependencies {
        provider: self.provider.clone(),
        resolver,
        token_generator: Arc::new(SecureTokenGenerator::new()),
        events: self.events.clone(),
      }
    }

    fn guard(&self, session: SessionStore, cookies: CookieJar) -> SessionGuard {
      SessionGuard::new(
        "web",
        session,
        cookies,
        self.deps(Arc::new(SessionStateResolver::new())),
        Duration::days(30),
      )
    }

    fn credentials(&self, password: &str) -> Credentials {
      Credentials::new(
        Email::new(self.user.email.clone()).unwrap(),
        Password::new(password).unwrap(),
      )
    }
  }

  /// Counts how often the guard asks for resolution
  struct CountingResolver {
    inner: SessionStateResolver,
    calls: AtomicUsize,
  }

  #[async_trait]
  impl UserResolver for CountingResolver {
    async fn resolve(&self, id: UserId, session: &SessionStore) -> Result<Option<User>, AuthError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.inner.resolve(id, session).await
    }
  }

  fn logged_in_session(guard_name: &str, user: &User, login_flag: bool) -> SessionStore {
    let session = SessionStore::start();
    session.put(&login_key(guard_name), user.id).unwrap();
    session.put(AUTH_USER_KEY, user).unwrap();
    session.put(AUTH_LOGIN_KEY, login_flag).unwrap();
    session
  }

  fn recaller_jar(value: &str) -> CookieJar {
    CookieJar::new(HashMap::from([(recaller_name("web"), value.to_string())]))
  }

  #[tokio::test]
  async fn test_empty_session_is_guest() {
    let fixture = Fixture::new();
    let guard = fixture.guard(SessionStore::start(), CookieJar::default());

    assert!(!guard.check().await.unwrap());
    assert!(guard.guest().await.unwrap());
    assert_eq!(guard.id().await.unwrap(), None);
    assert!(fixture.events.events().is_empty());
  }

  #[tokio::test]
  async fn test_session_state_resolves_user() {
    let fixture = Fixture::new();
    let session = logged_in_session("web", &fixture.user, true);
    let guard = fixture.guard(session, CookieJar::default());

    let user = guard.user().await.unwrap().unwrap();
    assert_eq!(user.id.value(), 42);
    assert!(guard.check().await.unwrap());
    assert!(!guard.via_remember());

    assert_eq!(
      fixture.events.events(),
      vec![AuthEvent::Authenticated {
        guard: "web".to_string(),
        user_id: fixture.user.id,
      }]
    );
  }

  #[tokio::test]
  async fn test_login_flag_false_is_not_authenticated() {
    let fixture = Fixture::new();
    let session = logged_in_session("web", &fixture.user, false);
    let guard = fixture.guard(session, CookieJar::default());

    assert!(guard.user().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_resolution_is_cached_for_the_request() {
    let fixture = Fixture::new();
    let resolver = Arc::new(CountingResolver {
      inner: SessionStateResolver::new(),
      calls: AtomicUsize::new(0),
    });
    let session = logged_in_session("web", &fixture.user, true);
    let guard = SessionGuard::new(
      "web",
      session.clone(),
      CookieJar::default(),
      fixture.deps(resolver.clone()),
      Duration::days(30),
    );

    let first = guard.user().await.unwrap();
    session.remove(AUTH_LOGIN_KEY);
    let second = guard.user().await.unwrap();

    assert_eq!(first, second);
    assert!(second.is_some());
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fixture.events.events().len(), 1);
  }

  #[tokio::test]
  async fn test_miss_is_not_cached() {
    let fixture = Fixture::new();
    let session = SessionStore::start();
    let guard = fixture.guard(session.clone(), CookieJar::default());

    assert!(guard.user().await.unwrap().is_none());

    session.put(&login_key("web"), fixture.user.id).unwrap();
    session.put(AUTH_USER_KEY, &fixture.user).unwrap();
    session.put(AUTH_LOGIN_KEY, true).unwrap();

    assert_eq!(guard.user().await.unwrap(), Some(fixture.user.clone()));
  }

  #[tokio::test]
  async fn test_recaller_restores_user_and_writes_session() {
    let fixture = Fixture::new();
    let token = RememberToken::from_string("remember-me-token").unwrap();
    fixture
      .provider
      .update_remember_token(fixture.user.id, &token)
      .await
      .unwrap();

    let session = SessionStore::start();
    let guard = fixture.guard(session.clone(), recaller_jar("42|remember-me-token"));

    let user = guard.user().await.unwrap().unwrap();
    assert_eq!(user.id.value(), 42);
    assert!(guard.via_remember());
    assert_eq!(session.get::<UserId>(&login_key("web")), Some(fixture.user.id));

    assert_eq!(
      fixture.events.events(),
      vec![AuthEvent::Login {
        guard: "web".to_string(),
        user_id: fixture.user.id,
        remember: true,
      }]
    );

    // A plain session lookup now succeeds without the cookie
    let next_request = fixture.guard(session, CookieJar::default());
    assert_eq!(next_request.id().await.unwrap(), Some(fixture.user.id));
    assert!(!next_request.via_remember());
  }

  #[tokio::test]
  async fn test_recaller_with_wrong_token_is_guest() {
    let fixture = Fixture::new();
    let token = RememberToken::from_string("the-real-token").unwrap();
    fixture
      .provider
      .update_remember_token(fixture.user.id, &token)
      .await
      .unwrap();

    let session = SessionStore::start();
    let guard = fixture.guard(session.clone(), recaller_jar("42|a-forged-token"));

    assert!(guard.user().await.unwrap().is_none());
    assert!(!session.is_dirty());
  }

  #[tokio::test]
  async fn test_malformed_recaller_is_ignored() {
    let fixture = Fixture::new();
    let guard = fixture.guard(SessionStore::start(), recaller_jar("garbage"));
    assert!(guard.user().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_logout_is_absorbing() {
    let fixture = Fixture::new();
    let session = logged_in_session("web", &fixture.user, true);
    let guard = fixture.guard(session.clone(), CookieJar::default());

    assert!(guard.check().await.unwrap());
    guard.logout().await.unwrap();

    assert!(!session.has(&login_key("web")));
    assert!(!session.has(AUTH_USER_KEY));
    assert!(!session.has(AUTH_LOGIN_KEY));

    // Even if stale state reappears, the request stays logged out
    session.put(&login_key("web"), fixture.user.id).unwrap();
    session.put(AUTH_USER_KEY, &fixture.user).unwrap();
    session.put(AUTH_LOGIN_KEY, true).unwrap();
    assert!(guard.user().await.unwrap().is_none());

    // Until a fresh login
    guard.login(fixture.user.clone(), false).await.unwrap();
    assert_eq!(guard.id().await.unwrap(), Some(fixture.user.id));
  }

  #[tokio::test]
  async fn test_logout_ignores_recaller_for_rest_of_request() {
    let fixture = Fixture::new();
    let token = RememberToken::from_string("remember-me-token").unwrap();
    fixture
      .provider
      .update_remember_token(fixture.user.id, &token)
      .await
      .unwrap();

    let cookies = recaller_jar("42|remember-me-token");
    let guard = fixture.guard(SessionStore::start(), cookies.clone());
    guard.logout().await.unwrap();

    assert!(guard.user().await.unwrap().is_none());

    let queued = cookies.queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].name, recaller_name("web"));
    assert!(queued[0].is_removal());

    // The old token was cycled, so the cookie is dead for later requests too
    let replay = fixture.guard(SessionStore::start(), recaller_jar("42|remember-me-token"));
    assert!(replay.user().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn test_attempt_with_valid_credentials_logs_in() {
    let fixture = Fixture::new();
    let session = SessionStore::start();
    let first_id = session.id();
    let guard = fixture.guard(session.clone(), CookieJar::default());

    assert!(
      guard
        .attempt(&fixture.credentials(PASSWORD), false)
        .await
        .unwrap()
    );

    assert_eq!(guard.id().await.unwrap(), Some(fixture.user.id));
    assert_ne!(session.id(), first_id);
    assert_eq!(session.get::<bool>(AUTH_LOGIN_KEY), Some(true));
    assert!(guard.cookies().queued().is_empty());
    assert!(!guard.issued_recaller());

    let names: Vec<_> = fixture.events.events().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["attempting", "validated", "login"]);
  }

  #[tokio::test]
  async fn test_attempt_with_wrong_password_fails() {
    let fixture = Fixture::new();
    let session = SessionStore::start();
    let guard = fixture.guard(session.clone(), CookieJar::default());

    assert!(
      !guard
        .attempt(&fixture.credentials("wrong-password"), false)
        .await
        .unwrap()
    );
    assert!(!session.is_dirty());
    assert!(!guard.check().await.unwrap());

    let events = fixture.events.events();
    assert_eq!(
      events.last(),
      Some(&AuthEvent::Failed {
        guard: "web".to_string(),
        email: fixture.user.email.clone(),
        user_id: Some(fixture.user.id),
      })
    );
  }

  #[tokio::test]
  async fn test_attempt_with_unknown_email_fails() {
    let fixture = Fixture::new();
    let guard = fixture.guard(SessionStore::start(), CookieJar::default());
    let credentials = Credentials::new(
      Email::new("nobody@example.org").unwrap(),
      Password::new(PASSWORD).unwrap(),
    );

    assert!(!guard.attempt(&credentials, true).await.unwrap());
    assert!(guard.cookies().queued().is_empty());
  }

  #[tokio::test]
  async fn test_login_with_remember_queues_recaller() {
    let fixture = Fixture::new();
    let guard = fixture.guard(SessionStore::start(), CookieJar::default());

    guard.login(fixture.user.clone(), true).await.unwrap();

    let queued = guard.cookies().queued();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].name, recaller_name("web"));
    assert_eq!(queued[0].lifetime, Some(Duration::days(30)));

    let recaller = Recaller::parse(&queued[0].value).unwrap();
    assert_eq!(recaller.id(), fixture.user.id);
    let found = fixture
      .provider
      .retrieve_by_token(recaller.id(), recaller.token())
      .await
      .unwrap();
    assert_eq!(found, Some(fixture.user.clone()));
    assert!(guard.issued_recaller());

    guard.logout().await.unwrap();
    assert!(!guard.issued_recaller());
  }

  #[tokio::test]
  async fn test_validate_does_not_log_in() {
    let fixture = Fixture::new();
    let session = SessionStore::start();
    let guard = fixture.guard(session.clone(), CookieJar::default());

    assert!(guard.validate(&fixture.credentials(PASSWORD)).await.unwrap());
    assert!(!guard.validate(&fixture.credentials("nope")).await.unwrap());
    assert!(!guard.has_user());
    assert!(!session.is_dirty());
  }

  #[tokio::test]
  async fn test_set_user_overrides_resolution() {
    let fixture = Fixture::new();
    let guard = fixture.guard(SessionStore::start(), CookieJar::default());

    assert!(!guard.has_user());
    guard.set_user(fixture.user.clone());
    assert!(guard.has_user());
    assert_eq!(guard.user().await.unwrap(), Some(fixture.user.clone()));
  }

  #[tokio::test]
  async fn test_login_using_id() {
    let fixture = Fixture::new();
    let guard = fixture.guard(SessionStore::start(), CookieJar::default());

    let missing = guard
      .login_using_id(UserId::new(404).unwrap(), false)
      .await
      .unwrap();
    assert!(missing.is_none());
    assert!(!guard.has_user());

    let found = guard.login_using_id(fixture.user.id, false).await.unwrap();
    assert_eq!(found, Some(fixture.user.clone()));
    assert!(guard.check().await.unwrap());
  }

  #[tokio::test]
  async fn test_provider_resolver_needs_only_identifier() {
    let fixture = Fixture::new();
    let session = SessionStore::start();
    session.put(&login_key("web"), fixture.user.id).unwrap();

    let guard = SessionGuard::new(
      "web",
      session,
      CookieJar::default(),
      fixture.deps(Arc::new(ProviderResolver::new(fixture.provider.clone()))),
      Duration::days(30),
    );

    assert_eq!(guard.user().await.unwrap(), Some(fixture.user.clone()));
  }
}
