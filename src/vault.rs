//! The unlocked/locked state of a user's session
//!
//! A [`VaultSession`] is the only long-lived owner of a [`DerivedKey`]. It
//! starts locked, holds exactly one key while unlocked, and wipes the key
//! on [`VaultSession::lock`], on drop, or when its inactivity timeout
//! elapses. Sessions are plain values: two sessions in one process never
//! share key material.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::aead::{self, Envelope};
use crate::error::{Result, SealnoteError};
use crate::kdf::{self, DerivedKey, Password, Salt};

/// Idle time after which an unlocked session locks itself
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Key lifetime policy for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Lock after this long without an unlock or cryptographic operation.
    /// `None` keeps the key until [`VaultSession::lock`] or drop.
    pub idle_timeout: Option<Duration>,
}

impl SessionPolicy {
    pub fn never_expire() -> Self {
        Self { idle_timeout: None }
    }

    pub fn idle_after(timeout: Duration) -> Self {
        Self {
            idle_timeout: Some(timeout),
        }
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self::idle_after(DEFAULT_IDLE_TIMEOUT)
    }
}

enum State {
    Locked,
    Unlocked {
        key: DerivedKey,
        last_activity: Instant,
    },
}

pub struct VaultSession {
    state: State,
    policy: SessionPolicy,
}

impl VaultSession {
    /// A locked session.
    pub fn new(policy: SessionPolicy) -> Self {
        Self {
            state: State::Locked,
            policy,
        }
    }

    /// Derive the key from `password` and `salt` and hold it.
    ///
    /// Unlocking an already unlocked session replaces (and wipes) the
    /// previous key.
    pub fn unlock(&mut self, password: &Password, salt: &Salt) {
        let key = kdf::derive(password, salt);
        self.install(key);
    }

    fn install(&mut self, key: DerivedKey) {
        let replaced = matches!(self.state, State::Unlocked { .. });
        self.state = State::Unlocked {
            key,
            last_activity: Instant::now(),
        };
        debug!(replaced, "vault unlocked");
    }

    /// Discard the key. Locking a locked session is a no-op.
    pub fn lock(&mut self) {
        if matches!(self.state, State::Unlocked { .. }) {
            self.state = State::Locked;
            debug!("vault locked");
        }
    }

    /// Whether a key is held, after applying the inactivity policy.
    pub fn is_unlocked(&mut self) -> bool {
        self.expire_if_idle(Instant::now());
        matches!(self.state, State::Unlocked { .. })
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Fails with [`ErrorKind::VaultLocked`](crate::error::ErrorKind::VaultLocked)
    /// unless a key is held.
    pub fn ensure_unlocked(&mut self) -> Result<()> {
        self.key().map(|_| ())
    }

    /// Encrypt plaintext under the session key.
    pub fn encrypt(&mut self, plaintext: &str) -> Result<Envelope> {
        let key = self.key()?;
        aead::encrypt(plaintext, key)
    }

    /// Decrypt an envelope under the session key.
    pub fn decrypt(&mut self, envelope: &Envelope) -> Result<String> {
        let key = self.key()?;
        aead::decrypt(envelope, key)
    }

    /// Locks the session if the idle timeout has elapsed at `now`.
    /// Returns true when this call locked it.
    fn expire_if_idle(&mut self, now: Instant) -> bool {
        let Some(timeout) = self.policy.idle_timeout else {
            return false;
        };
        let expired = match &self.state {
            State::Unlocked { last_activity, .. } => {
                now.saturating_duration_since(*last_activity) >= timeout
            }
            State::Locked => false,
        };
        if expired {
            self.state = State::Locked;
            info!(idle_secs = timeout.as_secs(), "vault locked after inactivity");
        }
        expired
    }

    fn key(&mut self) -> Result<&DerivedKey> {
        let now = Instant::now();
        self.expire_if_idle(now);
        match &mut self.state {
            State::Unlocked { key, last_activity } => {
                *last_activity = now;
                Ok(key)
            }
            State::Locked => Err(SealnoteError::vault_locked()),
        }
    }

    #[cfg(test)]
    pub(crate) fn unlocked_with(key: DerivedKey, policy: SessionPolicy) -> Self {
        let mut session = Self::new(policy);
        session.install(key);
        session
    }
}

impl Default for VaultSession {
    fn default() -> Self {
        Self::new(SessionPolicy::default())
    }
}

impl fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Locked => "locked",
            State::Unlocked { .. } => "unlocked",
        };
        f.debug_struct("VaultSession")
            .field("state", &state)
            .field("policy", &self.policy)
            .finish()
    }
}
