pub mod achievements;
pub mod auth;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod note;
pub mod profile;
pub mod progress;
pub mod session;

use std::error::Error;

use serde::Serialize;
use tracing::debug;

use scroll2study_core::auth::keyring_store;
use scroll2study_core::{Config, LocalIdentityProvider, SessionHandle, SqliteStore, StudyService};

/// Keyring entry holding the credential saved by `auth`.
pub const CREDENTIAL_ENTRY: &str = "session_credential";

pub type CliResult = Result<(), Box<dyn Error>>;

/// The explicit credential, or the one saved in the keyring.
pub fn resolve_credential(explicit: Option<String>) -> Result<String, Box<dyn Error>> {
    if let Some(credential) = explicit.filter(|c| !c.trim().is_empty()) {
        return Ok(credential);
    }
    match keyring_store::get(CREDENTIAL_ENTRY) {
        Ok(Some(credential)) => Ok(credential),
        Ok(None) => Err("not signed in: run `scroll2study auth anonymous` or pass --credential".into()),
        Err(e) => {
            debug!(error = %e, "keyring unavailable");
            Err("not signed in and no keyring available: pass --credential".into())
        }
    }
}

/// Sign in, open the database and make sure the profile exists.
pub fn open_service(credential: Option<String>) -> Result<StudyService<SqliteStore>, Box<dyn Error>> {
    let credential = resolve_credential(credential)?;
    let session = SessionHandle::sign_in(&LocalIdentityProvider, &credential)?;
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    let mut service = StudyService::new(store, session, &config)?;
    service.ensure_profile()?;
    Ok(service)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
