//! Snowflake connection handling and metadata listings
//!
//! Opens a session against the warehouse's REST endpoint with user-supplied
//! credentials and exposes pass-through listing queries (warehouses,
//! databases, schemas, views). No caching, no pagination beyond what the
//! warehouse returns.

mod error;
mod session;

pub use error::ConnectionError;
pub use session::{QueryResult, SnowflakeSession, StatementExecutor};

/// Credentials and target for one warehouse session.
///
/// Supplied once, immutable for the session.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Account identifier, either bare (`xy12345.eu-west-1`) or a full
    /// `*.snowflakecomputing.com` host
    pub account: String,
    /// Login name
    pub user: String,
    password: String,
    /// Warehouse to activate at login (optional)
    pub warehouse: Option<String>,
}

impl ConnectionConfig {
    pub fn new(
        account: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into().trim().to_string(),
            user: user.into().trim().to_string(),
            password: password.into(),
            warehouse: None,
        }
    }

    /// Set the warehouse to activate at login.
    ///
    /// Empty and whitespace-only names count as unset.
    pub fn with_warehouse(mut self, warehouse: impl Into<String>) -> Self {
        let warehouse = warehouse.into();
        let trimmed = warehouse.trim();
        self.warehouse = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Account name portion used in the login payload (host suffix removed).
    pub fn account_name(&self) -> String {
        let account = self.account.trim_start_matches("https://");
        match account.find(".snowflakecomputing.com") {
            Some(idx) => account[..idx].to_string(),
            None => account.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve the HTTPS host for this account.
    ///
    /// Fails up front on empty or malformed identifiers so a bad account
    /// never reaches the network, let alone a listing call.
    pub fn host(&self) -> Result<String, ConnectionError> {
        let account = self.account.trim_start_matches("https://").trim_end_matches('/');
        if account.is_empty() {
            return Err(ConnectionError::InvalidAccount(
                "account identifier is empty".to_string(),
            ));
        }
        if !account
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        {
            return Err(ConnectionError::InvalidAccount(format!(
                "account identifier contains unsupported characters: {}",
                account
            )));
        }
        if account.ends_with(".snowflakecomputing.com") {
            Ok(account.to_string())
        } else {
            Ok(format!("{}.snowflakecomputing.com", account))
        }
    }

    /// Check the fields a login requires are present.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        self.host()?;
        if self.user.trim().is_empty() {
            return Err(ConnectionError::MissingCredential("user"));
        }
        if self.password.is_empty() {
            return Err(ConnectionError::MissingCredential("password"));
        }
        Ok(())
    }
}

// Manual Debug so the password can never end up in logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &"***")
            .field("warehouse", &self.warehouse)
            .finish()
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.user, self.account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_from_bare_account() {
        let config = ConnectionConfig::new("xy12345.eu-west-1", "analyst", "pw");
        assert_eq!(
            config.host().unwrap(),
            "xy12345.eu-west-1.snowflakecomputing.com"
        );
        assert_eq!(config.account_name(), "xy12345.eu-west-1");
    }

    #[test]
    fn test_host_from_full_host() {
        let config = ConnectionConfig::new("xy12345.snowflakecomputing.com", "analyst", "pw");
        assert_eq!(config.host().unwrap(), "xy12345.snowflakecomputing.com");
        assert_eq!(config.account_name(), "xy12345");
    }

    #[test]
    fn test_host_strips_scheme_and_slash() {
        let config = ConnectionConfig::new("https://xy12345.snowflakecomputing.com/", "a", "pw");
        assert_eq!(config.host().unwrap(), "xy12345.snowflakecomputing.com");
    }

    #[test]
    fn test_invalid_account_rejected() {
        let config = ConnectionConfig::new("not a valid account!", "analyst", "pw");
        assert!(matches!(
            config.host(),
            Err(ConnectionError::InvalidAccount(_))
        ));

        let config = ConnectionConfig::new("", "analyst", "pw");
        assert!(matches!(
            config.host(),
            Err(ConnectionError::InvalidAccount(_))
        ));
    }

    #[test]
    fn test_validate_requires_user_and_password() {
        let config = ConnectionConfig::new("xy12345", "", "pw");
        assert!(matches!(
            config.validate(),
            Err(ConnectionError::MissingCredential("user"))
        ));

        let config = ConnectionConfig::new("xy12345", "analyst", "");
        assert!(matches!(
            config.validate(),
            Err(ConnectionError::MissingCredential("password"))
        ));
    }

    #[test]
    fn test_empty_warehouse_counts_as_unset() {
        let config = ConnectionConfig::new("xy12345", "analyst", "pw").with_warehouse("  ");
        assert!(config.warehouse.is_none());

        let config = ConnectionConfig::new("xy12345", "analyst", "pw").with_warehouse("COMPUTE_WH");
        assert_eq!(config.warehouse.as_deref(), Some("COMPUTE_WH"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = ConnectionConfig::new("xy12345", "analyst", "hunter2");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
