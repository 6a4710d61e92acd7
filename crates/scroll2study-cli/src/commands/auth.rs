use clap::Subcommand;
use serde_json::json;
use tracing::warn;

use scroll2study_core::ai::API_KEY_ENTRY;
use scroll2study_core::auth::keyring_store;
use scroll2study_core::{IdentityProvider, LocalIdentityProvider, ProfileStore, SqliteStore};

use super::{open_service, print_json, resolve_credential, CliResult, CREDENTIAL_ENTRY};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Create an email/password account and sign in
    Signup {
        email: String,
        password: String,
        /// Print the credential without saving it to the keyring
        #[arg(long)]
        no_save: bool,
    },
    /// Sign in with email and password
    Signin {
        email: String,
        password: String,
        #[arg(long)]
        no_save: bool,
    },
    /// Sign in as a new anonymous user
    Anonymous {
        #[arg(long)]
        no_save: bool,
    },
    /// Show who the current credential belongs to
    Status,
    /// Forget the saved credential
    Signout,
    /// Save the AI service API key in the OS keyring
    SetAiKey {
        key: String,
    },
}

pub fn run(action: AuthAction, credential: Option<String>) -> CliResult {
    match action {
        AuthAction::Signup {
            email,
            password,
            no_save,
        } => {
            let credential = LocalIdentityProvider::password_credential(&email, &password)?;
            if account_exists(&credential)? {
                return Err(format!("an account for {email} already exists").into());
            }
            sign_in(credential, !no_save)
        }
        AuthAction::Signin {
            email,
            password,
            no_save,
        } => {
            let credential = LocalIdentityProvider::password_credential(&email, &password)?;
            if !account_exists(&credential)? {
                return Err("invalid email or password".into());
            }
            sign_in(credential, !no_save)
        }
        AuthAction::Anonymous { no_save } => {
            sign_in(LocalIdentityProvider::anonymous_credential(), !no_save)
        }
        AuthAction::Status => {
            let credential = resolve_credential(credential)?;
            let identity = LocalIdentityProvider.resolve(&credential)?;
            print_json(&json!({
                "userId": identity.user_id,
                "isAnonymous": identity.is_anonymous,
            }))
        }
        AuthAction::Signout => {
            if let Err(e) = keyring_store::delete(CREDENTIAL_ENTRY) {
                warn!(error = %e, "could not remove credential from keyring");
            }
            print_json(&json!({ "signedOut": true }))
        }
        AuthAction::SetAiKey { key } => {
            keyring_store::set(API_KEY_ENTRY, &key)?;
            print_json(&json!({ "saved": API_KEY_ENTRY }))
        }
    }
}

/// Create the profile for `credential`, save it, and print it so it can
/// be passed back with `--credential`.
fn sign_in(credential: String, save: bool) -> CliResult {
    let service = open_service(Some(credential.clone()))?;
    if save {
        if let Err(e) = keyring_store::set(CREDENTIAL_ENTRY, &credential) {
            warn!(error = %e, "could not save credential to keyring");
        }
    }

    let identity = service.session().identity();
    print_json(&json!({
        "userId": identity.user_id,
        "isAnonymous": identity.is_anonymous,
        "credential": credential,
    }))
}

fn account_exists(credential: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let identity = LocalIdentityProvider.resolve(credential)?;
    Ok(SqliteStore::open()?.load_profile(&identity.user_id)?.is_some())
}
