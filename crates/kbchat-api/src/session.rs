//! Per-session state that outgoing requests depend on.
//!
//! Lifecycle: [`SessionContext::login`] installs a credential after the front end authenticates,
//! every request reads it through [`SessionContext::bearer_token`], and
//! [`SessionContext::logout`] tears it down. Nothing here is persisted.

use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use kbchat_core::UserRole;
use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub username: String,
    pub role: UserRole,
}

impl Credential {
    pub fn new(token: impl Into<String>, username: impl Into<String>, role: UserRole) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
            role,
        }
    }
}

// The bearer token never reaches logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    credential: Option<Credential>,
    theme: Theme,
}

#[derive(Debug, Default)]
pub struct SessionContext(RwLock<SessionInner>);

impl SessionContext {
    pub fn new(theme: Theme) -> Self {
        Self(RwLock::new(SessionInner {
            credential: None,
            theme,
        }))
    }

    pub fn login(&self, credential: Credential) {
        tracing::info!(username = %credential.username, role = ?credential.role, "session started");
        self.write().credential = Some(credential);
    }

    /// Drops the credential. The display preference outlives the login.
    pub fn logout(&self) {
        if self.write().credential.take().is_some() {
            tracing::info!("session ended");
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().credential.is_some()
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.read().credential.as_ref().map(|c| c.token.clone())
    }

    pub fn username(&self) -> Option<String> {
        self.read().credential.as_ref().map(|c| c.username.clone())
    }

    /// Role of the signed-in user; `EndUser` when signed out.
    pub fn role(&self) -> UserRole {
        self.read()
            .credential
            .as_ref()
            .map(|c| c.role)
            .unwrap_or_default()
    }

    pub fn theme(&self) -> Theme {
        self.read().theme
    }

    pub fn toggle_theme(&self) -> Theme {
        let mut guard = self.write();
        guard.theme = guard.theme.toggled();
        guard.theme
    }

    // A writer that panicked mid-update cannot leave these plain fields half-written, so a
    // poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
