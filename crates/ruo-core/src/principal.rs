//! Authenticated principals.

use serde::{Deserialize, Serialize};

/// The identity a security scheme established for a request.
///
/// Schemes are pluggable, so the variants only cover the common shapes;
/// anything else can be carried as [`Principal::Custom`].
///
/// # Example
///
/// ```rust
/// use ruo_core::Principal;
///
/// let principal = Principal::api_key("key-1", ["read"]);
/// assert_eq!(principal.log_id(), "apikey:key-1");
/// assert_eq!(principal.scopes(), vec!["read"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Principal {
    /// No credentials were required or presented.
    Anonymous,
    /// An end user.
    User {
        /// Stable user identifier.
        user_id: String,
        /// Granted roles or scopes.
        scopes: Vec<String>,
    },
    /// A caller authenticated with an API key.
    ApiKey {
        /// Key identifier, never the secret itself.
        key_id: String,
        /// Granted scopes.
        scopes: Vec<String>,
    },
    /// Anything a custom scheme wants to hand to handlers.
    Custom {
        /// Scheme-defined subject.
        subject: String,
        /// Scheme-defined attributes.
        attributes: serde_json::Value,
    },
}

impl Principal {
    /// Creates a user principal.
    #[must_use]
    pub fn user<I, S>(user_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::User {
            user_id: user_id.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an API key principal.
    #[must_use]
    pub fn api_key<I, S>(key_id: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::ApiKey {
            key_id: key_id.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never includes secrets.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::Anonymous => "anonymous".to_string(),
            Self::User { user_id, .. } => format!("user:{user_id}"),
            Self::ApiKey { key_id, .. } => format!("apikey:{key_id}"),
            Self::Custom { subject, .. } => subject.clone(),
        }
    }

    /// Returns the scopes granted to this principal.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        match self {
            Self::User { scopes, .. } | Self::ApiKey { scopes, .. } => {
                scopes.iter().map(String::as_str).collect()
            }
            Self::Anonymous | Self::Custom { .. } => Vec::new(),
        }
    }

    /// Returns true for [`Principal::Anonymous`].
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}
