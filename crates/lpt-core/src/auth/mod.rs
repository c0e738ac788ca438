//! Account binding for sync.
//!
//! Credentials are opaque to the sync engine: it only needs the account id
//! that names the remote pantry and the user id stamped into uploads.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::normalize_text;

const USER_ID_LEN: usize = 16;

/// A bound cloud account
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Remote pantry identifier; grants access to the basket
    pub account_id: String,
    pub user_id: String,
    pub email: String,
}

impl fmt::Debug for Account {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Account")
            .field("account_id", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .finish()
    }
}

impl Account {
    /// Bind an email to a pantry id, deriving a stable user id from the email.
    pub fn from_login(email: &str, account_id: &str) -> Result<Self> {
        let email = normalize_text(email)
            .ok_or_else(|| Error::InvalidInput("email must not be empty".to_string()))?;
        let account_id = normalize_text(account_id)
            .ok_or_else(|| Error::InvalidInput("pantry id must not be empty".to_string()))?;
        if account_id.contains('/') {
            return Err(Error::InvalidInput(
                "pantry id must not contain '/'".to_string(),
            ));
        }

        Ok(Self {
            user_id: derive_user_id(&email),
            account_id,
            email,
        })
    }
}

/// First 16 alphanumeric characters of the base64-encoded email.
#[must_use]
pub fn derive_user_id(email: &str) -> String {
    STANDARD
        .encode(email.as_bytes())
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(USER_ID_LEN)
        .collect()
}

/// Source of the currently bound account
pub trait CredentialProvider: Send + Sync {
    /// `None` when no account is bound
    fn current_account(&self) -> Option<Account>;
}

/// Fixed credentials, e.g. loaded once from a CLI profile
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    account: Option<Account>,
}

impl StaticCredentials {
    #[must_use]
    pub const fn new(account: Account) -> Self {
        Self {
            account: Some(account),
        }
    }

    #[must_use]
    pub const fn anonymous() -> Self {
        Self { account: None }
    }

    #[must_use]
    pub const fn from_option(account: Option<Account>) -> Self {
        Self { account }
    }
}

impl CredentialProvider for StaticCredentials {
    fn current_account(&self) -> Option<Account> {
        self.account.clone()
    }
}
