pub mod oauth;
pub mod storage;

pub use oauth::Identity;
pub use storage::IdentityStore;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{AuthorizationSettings, OAuthSettings};

/// Why the signed-in identity may not use the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("not signed in; run /login")]
    NotSignedIn,
    #[error("session expired; run /login")]
    Expired,
    #[error("{0} is not authorized to use this dashboard")]
    NotAllowed(String),
}

/// The allow-list check run before any data is shown.
pub struct AccessGate<'a> {
    settings: &'a AuthorizationSettings,
}

impl<'a> AccessGate<'a> {
    pub fn new(settings: &'a AuthorizationSettings) -> Self {
        Self { settings }
    }

    pub fn check(&self, identity: Option<&Identity>) -> Result<(), AccessDenied> {
        let identity = identity.ok_or(AccessDenied::NotSignedIn)?;
        if identity.is_expired() {
            return Err(AccessDenied::Expired);
        }
        if !self.settings.is_allowed(&identity.email) {
            warn!(email = %identity.email, "access denied");
            return Err(AccessDenied::NotAllowed(identity.email.clone()));
        }
        Ok(())
    }
}

/// Complete the OAuth login: exchange the code, check the allow-list, and
/// save the identity.
///
/// This is the shared logic used by both the CLI `smsq login` subcommand
/// and the `/login` REPL slash command. A refused identity is never stored.
pub async fn login(
    db_path: &str,
    oauth: &OAuthSettings,
    authorization: &AuthorizationSettings,
    code: &str,
    verifier: &str,
) -> Result<Identity> {
    let identity = oauth::exchange_code(oauth, code, verifier)
        .await
        .context("token exchange failed")?;
    AccessGate::new(authorization).check(Some(&identity))?;
    let store = IdentityStore::open(db_path).context("failed to open identity store")?;
    store
        .set(&identity)
        .context("failed to save identity")?;
    info!(email = %identity.email, "agent signed in");
    Ok(identity)
}

/// Remove the stored identity.
///
/// This is the shared logic used by both the CLI `smsq logout` subcommand
/// and the `/logout` REPL slash command.
pub fn logout(db_path: &str) -> Result<()> {
    let store = IdentityStore::open(db_path).context("failed to open identity store")?;
    store.clear().context("failed to remove identity")?;
    Ok(())
}

/// The stored identity, if any.
pub fn current(db_path: &str) -> Result<Option<Identity>> {
    let store = IdentityStore::open(db_path).context("failed to open identity store")?;
    store.get()
}
