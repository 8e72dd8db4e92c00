use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};

use crate::config::APP_NAME;

const ADMIN_ACCOUNT: &str = "admin-token";

/// Save the manual-trigger admin token into the OS keyring
pub fn save_admin_token(token: &str) -> Result<()> {
    let entry = Entry::new(APP_NAME, ADMIN_ACCOUNT);
    entry?
        .set_password(token)
        .map_err(|e| anyhow!(e.to_string()))?;
    Ok(())
}

/// Load the admin token from the keyring
pub fn load_admin_token() -> Result<Option<String>> {
    let entry = Entry::new(APP_NAME, ADMIN_ACCOUNT);
    match entry?.get_password() {
        Ok(v) => Ok(Some(v)),
        Err(KeyringError::NoEntry) => Ok(None),
        Err(e) => Err(anyhow!(e.to_string())),
    }
}
