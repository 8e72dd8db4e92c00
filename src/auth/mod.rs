pub mod token_store;

use log::warn;

pub const ADMIN_TOKEN_ENV: &str = "MAIL_ERROR_FORWARDER_ADMIN_TOKEN";

/// Admin token from the keyring, falling back to the environment.
pub fn resolve_admin_token() -> Option<String> {
    let stored = token_store::load_admin_token().unwrap_or_else(|e| {
        warn!("keyring unavailable: {e}");
        None
    });
    stored
        .or_else(|| std::env::var(ADMIN_TOKEN_ENV).ok())
        .filter(|t| !t.is_empty())
}
