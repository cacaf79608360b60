//! Signed-in state on top of an [`AccountStore`].
//!
//! Observers call [`Authenticator::subscribe`] and are woken on every
//! sign-up, log-in and sign-out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{AuthError, Result};
use crate::store::{AccountStore, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthState {
    pub is_authenticated: bool,
    pub current_user: Option<UserId>,
}

impl AuthState {
    fn signed_in(user_id: UserId) -> Self {
        Self {
            is_authenticated: true,
            current_user: Some(user_id),
        }
    }
}

pub struct Authenticator<S> {
    store: Arc<S>,
    state: watch::Sender<AuthState>,
}

impl<S: AccountStore> Authenticator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::restore(store, None)
    }

    /// Resume a session persisted by the caller.
    pub fn restore(store: Arc<S>, user_id: Option<UserId>) -> Self {
        let initial = user_id.map(AuthState::signed_in).unwrap_or_default();
        let (state, _) = watch::channel(initial);
        Self { store, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.state.borrow().current_user.clone()
    }

    pub fn require_user(&self) -> Result<UserId> {
        self.current_user()
            .ok_or_else(|| AuthError::NotSignedIn.into())
    }

    /// Create an account and sign into it.
    pub fn sign_up(&self, email: &str, password: &str) -> Result<UserId> {
        let user_id = self.store.create_user(email, password)?;
        tracing::info!(%user_id, "account created");
        self.state.send_replace(AuthState::signed_in(user_id.clone()));
        Ok(user_id)
    }

    pub fn log_in(&self, email: &str, password: &str) -> Result<UserId> {
        let user_id = self.store.sign_in(email, password)?;
        tracing::info!(%user_id, "signed in");
        self.state.send_replace(AuthState::signed_in(user_id.clone()));
        Ok(user_id)
    }

    /// Always leaves the local state signed out, even if the store call fails.
    pub fn sign_out(&self) {
        if let Some(user_id) = self.current_user() {
            if let Err(e) = self.store.sign_out(&user_id) {
                tracing::warn!(%user_id, error = %e, "store sign-out failed");
            }
            tracing::info!(%user_id, "signed out");
        }
        self.state.send_replace(AuthState::default());
    }
}
