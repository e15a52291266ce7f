//! Session persistence backends.

use super::{AuthError, AuthResult, AuthSession, SessionPersistence};

const KEYRING_SERVICE_NAME: &str = "chatronix";

/// Keeps the session in the OS credential store, one entry per Supabase
/// project.
#[derive(Clone, Debug)]
pub struct KeyringSessionStore {
    account: String,
}

impl KeyringSessionStore {
    pub fn new(supabase_url: &str) -> Self {
        Self {
            account: format!("supabase_session:{}", supabase_url.trim_end_matches('/')),
        }
    }

    fn read_raw(&self) -> AuthResult<Option<String>> {
        store::get(&self.account)
    }
}

impl SessionPersistence for KeyringSessionStore {
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(raw) = self.read_raw()? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        store::set(&self.account, &raw)
    }

    fn clear_session(&self) -> AuthResult<()> {
        store::delete(&self.account)
    }
}

#[cfg(not(test))]
mod store {
    use super::{AuthError, AuthResult, KEYRING_SERVICE_NAME};

    fn entry(account: &str) -> AuthResult<keyring::Entry> {
        keyring::Entry::new(KEYRING_SERVICE_NAME, account)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    pub fn get(account: &str) -> AuthResult<Option<String>> {
        match entry(account)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    pub fn set(account: &str, value: &str) -> AuthResult<()> {
        entry(account)?
            .set_password(value)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    pub fn delete(account: &str) -> AuthResult<()> {
        match entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }
}


#[cfg(test)]
impl KeyringSessionStore {
    /// Overwrite the stored entry with arbitrary text.
    pub(crate) fn put_raw(&self, raw: &str) {
        store::set(&self.account, raw).unwrap();
    }

    pub(crate) fn has_entry(&self) -> bool {
        self.read_raw().unwrap().is_some()
    }
}
