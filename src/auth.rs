//! Shared sign-in state for the API client and the session controller.
//!
//! One `AuthContext` is created at start-up with [`AuthContext::init`] and cloned into
//! whatever needs it; [`AuthContext::logout`] tears the identity down for every holder.

use crate::config::Config;
use crate::logger;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub display_name: String,
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    inner: Arc<RwLock<Option<Identity>>>,
}

impl AuthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the context from configuration. Identity is only set when both a token and
    /// a user id are configured.
    pub fn init(config: &Config) -> Self {
        let ctx = Self::new();
        match (&config.token, &config.user_id) {
            (Some(token), Some(user_id)) => {
                ctx.sign_in(Identity {
                    user_id: user_id.clone(),
                    display_name: config.username.clone().unwrap_or_else(|| user_id.clone()),
                    token: token.clone(),
                    expires_at: config.token_expires_at,
                });
            }
            _ => logger::log("No identity configured, starting signed out"),
        }
        ctx
    }

    pub fn sign_in(&self, identity: Identity) {
        logger::log(&format!("Signed in as {}", identity.user_id));
        if let Ok(mut guard) = self.inner.write() {
            *guard = Some(identity);
        }
    }

    pub fn logout(&self) {
        if let Ok(mut guard) = self.inner.write()
            && guard.take().is_some()
        {
            logger::log("Signed out");
        }
    }

    /// The identity, if present and not expired.
    pub fn active_identity(&self) -> Option<Identity> {
        let guard = self.inner.read().ok()?;
        guard
            .as_ref()
            .filter(|identity| !identity.is_expired_at(Utc::now()))
            .cloned()
    }

    pub fn is_active(&self) -> bool {
        self.active_identity().is_some()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.active_identity().map(|identity| identity.token)
    }

    pub fn set_display_name(&self, name: &str) {
        if let Ok(mut guard) = self.inner.write()
            && let Some(identity) = guard.as_mut()
        {
            identity.display_name = name.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity(expires_at: Option<DateTime<Utc>>) -> Identity {
        Identity {
            user_id: "u-1".to_string(),
            display_name: "ada".to_string(),
            token: "secret".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_new_context_is_signed_out() {
        let ctx = AuthContext::new();
        assert!(!ctx.is_active());
        assert!(ctx.bearer_token().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let ctx = AuthContext::new();
        let other = ctx.clone();
        ctx.sign_in(identity(None));
        assert_eq!(other.bearer_token().as_deref(), Some("secret"));

        other.logout();
        assert!(!ctx.is_active());
    }

    #[test]
    fn test_expired_identity_is_inactive() {
        let ctx = AuthContext::new();
        ctx.sign_in(identity(Some(Utc::now() - Duration::minutes(1))));
        assert!(!ctx.is_active());

        ctx.sign_in(identity(Some(Utc::now() + Duration::hours(1))));
        assert!(ctx.is_active());
    }

    #[test]
    fn test_init_requires_token_and_user() {
        let mut config = crate::config::Config::from_lookup(|_| None, None).unwrap();
        config.token = Some("tok".to_string());
        assert!(!AuthContext::init(&config).is_active());

        config.user_id = Some("u-9".to_string());
        let ctx = AuthContext::init(&config);
        let identity = ctx.active_identity().unwrap();
        assert_eq!(identity.display_name, "u-9");
    }

    #[test]
    fn test_set_display_name() {
        let ctx = AuthContext::new();
        ctx.sign_in(identity(None));
        ctx.set_display_name("Ada L.");
        assert_eq!(ctx.active_identity().unwrap().display_name, "Ada L.");
    }
}
