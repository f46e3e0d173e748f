use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;

use super::cookies::CookieJar;
use super::guard::{FlagGuard, Guard, SessionGuard, SessionGuardDependencies};
use super::ports::{AuthEventDispatcher, TokenGenerator, UserProvider, UserResolver};
use super::resolvers::{ProviderResolver, SessionStateResolver};
use super::session::SessionStore;

/// Default remember-cookie lifetime (30 days)
const REMEMBER_ME_TTL_DAYS: i64 = 30;

/// How the per-request guard resolves its user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardDriver {
  /// `SessionGuard` reading the stashed `auth.user` record
  #[default]
  SessionState,
  /// `SessionGuard` looking the identifier up in the user provider
  Provider,
  /// `FlagGuard`: session flag pair only, no credentials or remember cookie
  Flag,
}

/// Configuration for the authentication manager
#[derive(Debug, Clone)]
pub struct AuthManagerConfig {
  pub guard_name: String,
  pub driver: GuardDriver,
  pub remember_ttl: Duration,
}

impl Default for AuthManagerConfig {
  fn default() -> Self {
    Self {
      guard_name: "web".to_string(),
      driver: GuardDriver::default(),
      remember_ttl: Duration::days(REMEMBER_ME_TTL_DAYS),
    }
  }
}

/// Builds per-request guards from the shared authentication services
pub struct AuthManager {
  provider: Arc<dyn UserProvider>,
  token_generator: Arc<dyn TokenGenerator>,
  events: Arc<dyn AuthEventDispatcher>,
  resolver: Arc<dyn UserResolver>,
  config: AuthManagerConfig,
}

impl AuthManager {
  /// Creates a new instance of AuthManager
  pub fn new(
    provider: Arc<dyn UserProvider>,
    token_generator: Arc<dyn TokenGenerator>,
    events: Arc<dyn AuthEventDispatcher>,
    config: AuthManagerConfig,
  ) -> Self {
    let resolver: Arc<dyn UserResolver> = match config.driver {
      GuardDriver::Provider => Arc::new(ProviderResolver::new(provider.clone())),
      GuardDriver::SessionState | GuardDriver::Flag => Arc::new(SessionStateResolver::new()),
    };

    Self {
      provider,
      token_generator,
      events,
      resolver,
      config,
    }
  }

  pub fn config(&self) -> &AuthManagerConfig {
    &self.config
  }

  pub fn guard_name(&self) -> &str {
    &self.config.guard_name
  }

  /// Builds the guard for one request around its session and cookies
  pub fn guard(&self, session: SessionStore, cookies: CookieJar) -> Arc<dyn Guard> {
    match self.config.driver {
      GuardDriver::Flag => Arc::new(FlagGuard::new(
        self.config.guard_name.clone(),
        session,
        self.events.clone(),
      )),
      GuardDriver::SessionState | GuardDriver::Provider => Arc::new(SessionGuard::new(
        self.config.guard_name.clone(),
        session,
        cookies,
        SessionGuardDependencies {
          provider: self.provider.clone(),
          resolver: self.resolver.clone(),
          token_generator: self.token_generator.clone(),
          events: self.events.clone(),
        },
        self.config.remember_ttl,
      )),
    }
  }
}
