//! Identity, session lifetime and local credential rules.
//!
//! Identity issuance belongs to an external provider; this module only
//! turns an opaque bearer credential into a [`UserId`] through the
//! [`IdentityProvider`] seam and tracks whether the session is still
//! signed in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{CoreError, Result, ValidationError};
use crate::profile::UserId;

const MIN_PASSWORD_LEN: usize = 6;

/// Who the current session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub is_anonymous: bool,
}

/// Resolves a bearer credential to an identity.
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, credential: &str) -> Result<Identity>;
}

/// Offline provider: the user id is the SHA-256 of the credential.
///
/// Credentials prefixed with `anon:` resolve to anonymous identities.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalIdentityProvider;

impl LocalIdentityProvider {
    /// Mint a fresh anonymous credential.
    pub fn anonymous_credential() -> String {
        format!("anon:{}", uuid::Uuid::new_v4())
    }

    /// Credential for an email/password sign-in, after local validation.
    pub fn password_credential(email: &str, password: &str) -> Result<String> {
        validate_email(email)?;
        validate_password(password)?;
        let mut hasher = Sha256::new();
        hasher.update(email.trim().to_lowercase().as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        Ok(format!("pw:{}", hex::encode(hasher.finalize())))
    }
}

impl IdentityProvider for LocalIdentityProvider {
    fn resolve(&self, credential: &str) -> Result<Identity> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(CoreError::NotAuthenticated("empty credential".into()));
        }
        let digest = Sha256::digest(credential.as_bytes());
        Ok(Identity {
            user_id: UserId::new(hex::encode(&digest[..16])),
            is_anonymous: credential.starts_with("anon:"),
        })
    }
}

/// A signed-in session. Clones share the sign-out flag.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    identity: Identity,
    active: Arc<AtomicBool>,
}

impl SessionHandle {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn sign_in(provider: &dyn IdentityProvider, credential: &str) -> Result<Self> {
        let identity = provider.resolve(credential)?;
        info!(user = %identity.user_id, anonymous = identity.is_anonymous, "signed in");
        Ok(Self::new(identity))
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn sign_out(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!(user = %self.identity.user_id, "signed out");
        }
    }

    /// Fails once the session has signed out.
    pub fn ensure_active(&self) -> Result<&Identity> {
        if self.is_active() {
            Ok(&self.identity)
        } else {
            Err(CoreError::NotAuthenticated(format!(
                "session for {} has signed out",
                self.identity.user_id
            )))
        }
    }
}

/// Local email shape check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail(format!("'{email}' has no '@'")));
    };
    let domain_ok = domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains('@');
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail(format!("'{email}' is not a valid address")));
    }
    Ok(())
}

/// Passwords need at least six characters.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::InvalidPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Thin wrapper around the OS keyring for credential storage.
pub mod keyring_store {
    const SERVICE: &str = "scroll2study";

    pub fn get(key: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.get_password() {
            Ok(pw) => Ok(Some(pw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        entry.set_password(value)?;
        Ok(())
    }

    pub fn delete(key: &str) -> Result<(), Box<dyn std::error::Error>> {
        let entry = keyring::Entry::new(SERVICE, key)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
