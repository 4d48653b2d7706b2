//! Account credentials.
//!
//! Loaded once at process start, never mutated. The secret never shows
//! up in `Debug` output, so credentials can sit inside structs that get
//! logged.

use std::fmt;

use realmgate_protocol::AccountId;

use crate::AuthError;

/// An account identifier plus its secret (email + password, or
/// equivalent).
#[derive(Clone)]
pub struct Credentials {
    account: AccountId,
    secret: String,
}

impl Credentials {
    /// Validates and builds credentials.
    ///
    /// # Errors
    /// Returns [`AuthError::Configuration`] if either part is empty
    /// (after trimming), or the identifier contains whitespace or
    /// control characters. The operator must fix the input, so this is
    /// never retried.
    pub fn new(
        identifier: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let identifier = identifier.into();
        let secret = secret.into();

        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(AuthError::Configuration(
                "account identifier is missing".into(),
            ));
        }
        if identifier
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(AuthError::Configuration(
                "account identifier contains whitespace or control characters"
                    .into(),
            ));
        }
        if secret.trim().is_empty() {
            return Err(AuthError::Configuration(
                "account secret is missing".into(),
            ));
        }

        Ok(Self {
            account: AccountId::new(identifier),
            secret,
        })
    }

    /// Builds credentials from optional inputs, as they arrive from the
    /// process boundary. A missing part is a configuration error.
    pub fn from_parts(
        identifier: Option<String>,
        secret: Option<String>,
    ) -> Result<Self, AuthError> {
        match (identifier, secret) {
            (Some(identifier), Some(secret)) => Self::new(identifier, secret),
            (None, _) => Err(AuthError::Configuration(
                "account identifier is missing".into(),
            )),
            (_, None) => Err(AuthError::Configuration(
                "account secret is missing".into(),
            )),
        }
    }

    /// The account these credentials belong to.
    pub fn account(&self) -> &AccountId {
        &self.account
    }

    /// The secret. Only identity providers should need this.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .finish()
    }
}
