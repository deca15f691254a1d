//! Session store: the bearer token and profile of the signed-in user.
//!
//! Reads go through an in-memory cache first and fall back to the durable
//! store, populating the cache on hit. Nothing stored, or a profile that no
//! longer parses, reads as absent rather than as an error.
//!
//! Every mutation bumps a generation counter published on a `watch`
//! channel, so views can re-check access when the session changes instead
//! of polling on each render.

pub mod storage;

use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::api::{ApiError, AuthApi};
use crate::models::{LoginRequest, Profile, ProfileUpdate, Role};
pub use storage::{DurableStore, FileStore, MemoryStore, StorageError, PROFILE_KEY, TOKEN_KEY};

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Identity is valid but has no application profile yet.
    #[error("No profile for this identity, onboarding required")]
    ProfileNotFound,

    #[error("Login rejected: {0}")]
    Rejected(String),

    #[error("Refusing to store an empty session token")]
    EmptyToken,

    #[error(transparent)]
    Api(ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Profile serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════
// Events
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    ProfileUpdated,
    SignedOut,
}

/// Latest session change. `generation` increases by one per change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSignal {
    pub generation: u64,
    pub event: SessionEvent,
}

/// Point-in-time view of the session, as the access gate consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub profile: Option<Profile>,
}

// ═══════════════════════════════════════════════════════════
// SessionStore
// ═══════════════════════════════════════════════════════════

/// Bearer token, zeroed when replaced or dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SessionToken(String);

#[derive(Default)]
struct Cache {
    token: Option<SessionToken>,
    profile: Option<Profile>,
}

pub struct SessionStore {
    cache: RwLock<Cache>,
    durable: Arc<dyn DurableStore>,
    events: watch::Sender<SessionSignal>,
}

impl SessionStore {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        let (events, _) = watch::channel(SessionSignal {
            generation: 0,
            event: SessionEvent::SignedOut,
        });
        Self {
            cache: RwLock::new(Cache::default()),
            durable,
            events,
        }
    }

    /// Session persisted as files under `dir`.
    pub fn open(dir: &Path) -> Self {
        Self::new(Arc::new(FileStore::new(dir)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    // ── Read path ────────────────────────────────────────

    /// Current token, or `None`. Never fails.
    pub fn token(&self) -> Option<String> {
        if let Some(token) = self.read_cache().token.as_ref() {
            return Some(token.0.clone());
        }
        let stored = self.load(TOKEN_KEY)?;
        if stored.is_empty() {
            return None;
        }
        self.write_cache().token = Some(SessionToken(stored.clone()));
        Some(stored)
    }

    /// Current profile, or `None`. Never fails.
    pub fn profile(&self) -> Option<Profile> {
        if let Some(profile) = self.read_cache().profile.as_ref() {
            return Some(profile.clone());
        }
        let stored = self.load(PROFILE_KEY)?;
        match serde_json::from_str::<Profile>(&stored) {
            Ok(profile) => {
                self.write_cache().profile = Some(profile.clone());
                Some(profile)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored profile is unreadable, ignoring");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// True when a profile is present and its role is in `roles`.
    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.profile().is_some_and(|p| roles.contains(&p.role))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            authenticated: self.is_authenticated(),
            profile: self.profile(),
        }
    }

    /// Receiver of session change signals.
    pub fn subscribe(&self) -> watch::Receiver<SessionSignal> {
        self.events.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.events.borrow().generation
    }

    // ── Write path ───────────────────────────────────────

    /// Exchange an identity token for an application session.
    ///
    /// A 404 from the backend means the identity has no profile yet and
    /// maps to [`SessionError::ProfileNotFound`]. Passing a request built
    /// with [`LoginRequest::onboarding`] registers the profile instead.
    pub async fn login<A: AuthApi>(
        &self,
        api: &A,
        request: &LoginRequest,
    ) -> Result<Profile, SessionError> {
        match api.verify_google(request).await {
            Ok(auth) => {
                self.set_session(&auth.jwt, auth.profile.clone())?;
                tracing::info!(role = %auth.profile.role, "Signed in");
                Ok(auth.profile)
            }
            Err(ApiError::ProfileNotFound | ApiError::NotFound(_)) => {
                tracing::info!("Identity has no profile, onboarding required");
                Err(SessionError::ProfileNotFound)
            }
            Err(ApiError::Unauthorized(msg) | ApiError::Validation(msg)) => {
                tracing::warn!("Login rejected by backend");
                Err(SessionError::Rejected(msg))
            }
            Err(e) => Err(SessionError::Api(e)),
        }
    }

    /// Store a token and profile, replacing whatever was there.
    pub fn set_session(&self, token: &str, profile: Profile) -> Result<(), SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        let profile_json = serde_json::to_string(&profile)?;
        self.durable.set(TOKEN_KEY, token)?;
        self.durable.set(PROFILE_KEY, &profile_json)?;
        {
            let mut cache = self.write_cache();
            cache.token = Some(SessionToken(token.to_string()));
            cache.profile = Some(profile);
        }
        self.emit(SessionEvent::SignedIn);
        Ok(())
    }

    /// Replace the cached profile wholesale (onboarding result).
    pub fn set_profile(&self, profile: Profile) -> Result<(), SessionError> {
        self.durable.set(PROFILE_KEY, &serde_json::to_string(&profile)?)?;
        self.write_cache().profile = Some(profile);
        self.emit(SessionEvent::ProfileUpdated);
        Ok(())
    }

    /// Merge `update` into the cached profile and persist it.
    ///
    /// Returns `Ok(false)` without doing anything when no profile is cached.
    /// It does not fetch the profile from the backend first.
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<bool, SessionError> {
        let Some(mut profile) = self.profile() else {
            tracing::debug!("update_profile with no cached profile, ignoring");
            return Ok(false);
        };
        profile.merge(update);
        self.set_profile(profile)?;
        Ok(true)
    }

    /// Clear memory and durable storage. Idempotent; storage failures are
    /// logged and do not stop the memory cache from being cleared.
    pub fn logout(&self) {
        {
            let mut cache = self.write_cache();
            cache.token = None;
            cache.profile = None;
        }
        for key in [TOKEN_KEY, PROFILE_KEY] {
            if let Err(e) = self.durable.remove(key) {
                tracing::warn!(key, error = %e, "Failed to clear stored session value");
            }
        }
        self.emit(SessionEvent::SignedOut);
        tracing::info!("Signed out");
    }

    // ── Internals ────────────────────────────────────────

    fn load(&self, key: &str) -> Option<String> {
        match self.durable.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read stored session value");
                None
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        self.events.send_modify(|signal| {
            signal.generation += 1;
            signal.event = event;
        });
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, Cache> {
        self.cache.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, Cache> {
        self.cache.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
