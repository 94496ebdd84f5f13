//! Session against the Snowflake REST endpoint
//!
//! Speaks the warehouse driver wire API: `/session/v1/login-request` to open
//! a session, `/queries/v1/query-request` to run statements. Every result
//! comes back as `rowtype` (column metadata) plus `rowset` (string cells);
//! [`QueryResult`] is the thin typed view over that.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::ConnectionConfig;
use super::error::ConnectionError;

const CLIENT_APP_ID: &str = "snow2gcp";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Rows and column names returned by one statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    /// Column names in result order
    pub columns: Vec<String>,
    /// Row cells; `None` is SQL NULL
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// Index of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// All non-null values of one column, in row order.
    pub fn column_values(&self, name: &str) -> Vec<String> {
        match self.column_index(name) {
            Some(idx) => self
                .rows
                .iter()
                .filter_map(|row| row.get(idx).and_then(|cell| cell.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// First cell of the first row, the shape scalar queries return.
    pub fn first_value(&self) -> Option<&str> {
        self.rows.first()?.first()?.as_deref()
    }

    /// Cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }
}

/// Seam for anything that can run a SQL statement.
///
/// The live session implements it against the REST endpoint; tests provide
/// scripted implementations.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ConnectionError>;
}

/// An authenticated warehouse session.
pub struct SnowflakeSession {
    config: ConnectionConfig,
    http: reqwest::Client,
    base_url: String,
    token: String,
    sequence: AtomicU64,
}

impl SnowflakeSession {
    /// Open a session with the given credentials.
    ///
    /// Local validation (account shape, required fields) runs before any
    /// network traffic; the warehouse's own rejection comes back as
    /// [`ConnectionError::AuthenticationFailed`] with its message verbatim.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ConnectionError> {
        config.validate()?;
        let host = config.host()?;
        let base_url = format!("https://{}", host);

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ConnectionError::from_reqwest)?;

        let account_name = config.account_name();
        let login = LoginRequest {
            data: LoginRequestData {
                login_name: &config.user,
                password: config.password(),
                account_name: &account_name,
                client_app_id: CLIENT_APP_ID,
                client_app_version: env!("CARGO_PKG_VERSION"),
            },
        };

        let mut request = http
            .post(format!("{}/session/v1/login-request", base_url))
            .query(&[("requestId", Uuid::new_v4().to_string())]);
        if let Some(warehouse) = &config.warehouse {
            request = request.query(&[("warehouse", warehouse)]);
        }

        let response = request
            .json(&login)
            .send()
            .await
            .map_err(ConnectionError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = truncated_body(response).await;
            return Err(ConnectionError::Http(format!(
                "login returned HTTP {}: {}",
                status, body
            )));
        }

        let login_response: LoginResponse = response
            .json()
            .await
            .map_err(|e| ConnectionError::Protocol(format!("malformed login response: {}", e)))?;

        if !login_response.success {
            return Err(ConnectionError::AuthenticationFailed {
                code: login_response.code,
                message: login_response
                    .message
                    .unwrap_or_else(|| "login rejected".to_string()),
            });
        }

        let token = login_response
            .data
            .and_then(|d| d.token)
            .ok_or_else(|| {
                ConnectionError::Protocol("login succeeded without a session token".to_string())
            })?;

        info!(account = %config.account, user = %config.user, "warehouse session opened");

        Ok(Self {
            config,
            http,
            base_url,
            token,
            sequence: AtomicU64::new(1),
        })
    }

    /// The configuration this session was opened with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Run one statement and return its result set.
    pub async fn execute(&self, sql: &str) -> Result<QueryResult, ConnectionError> {
        let body = QueryRequest {
            sql_text: sql,
            async_exec: false,
            sequence_id: self.sequence.fetch_add(1, Ordering::Relaxed),
            is_internal: false,
        };

        debug!(statement = first_line(sql), "executing statement");

        let response = self
            .http
            .post(format!("{}/queries/v1/query-request", self.base_url))
            .query(&[("requestId", Uuid::new_v4().to_string())])
            .header("Authorization", format!("Snowflake Token=\"{}\"", self.token))
            .header("Accept", "application/snowflake")
            .json(&body)
            .send()
            .await
            .map_err(ConnectionError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = truncated_body(response).await;
            return Err(ConnectionError::Http(format!(
                "query returned HTTP {}: {}",
                status, body
            )));
        }

        let query_response: QueryResponse = response
            .json()
            .await
            .map_err(|e| ConnectionError::Protocol(format!("malformed query response: {}", e)))?;

        if !query_response.success {
            return Err(ConnectionError::Statement {
                code: query_response.code,
                message: query_response
                    .message
                    .unwrap_or_else(|| "statement rejected".to_string()),
            });
        }

        let data = query_response
            .data
            .ok_or_else(|| ConnectionError::Protocol("query response carried no data".to_string()))?;

        Ok(data.into_result())
    }

    /// `SHOW WAREHOUSES`
    pub async fn list_warehouses(&self) -> Result<Vec<String>, ConnectionError> {
        self.names_from_show("SHOW WAREHOUSES").await
    }

    /// `SHOW DATABASES`
    pub async fn list_databases(&self) -> Result<Vec<String>, ConnectionError> {
        self.names_from_show("SHOW DATABASES").await
    }

    /// `SHOW SCHEMAS IN DATABASE <db>`
    pub async fn list_schemas(&self, database: &str) -> Result<Vec<String>, ConnectionError> {
        self.names_from_show(&format!("SHOW SCHEMAS IN DATABASE {}", database))
            .await
    }

    /// `SHOW VIEWS IN SCHEMA <db>."<schema>"`
    pub async fn list_views(
        &self,
        database: &str,
        schema: &str,
    ) -> Result<Vec<String>, ConnectionError> {
        self.names_from_show(&format!("SHOW VIEWS IN SCHEMA {}.\"{}\"", database, schema))
            .await
    }

    /// Switch the active warehouse for this session.
    pub async fn use_warehouse(&self, warehouse: &str) -> Result<(), ConnectionError> {
        self.execute(&format!("USE WAREHOUSE {}", warehouse)).await?;
        Ok(())
    }

    /// Log the session out. Best effort: failures are logged, not returned.
    pub async fn close(&self) {
        let request_id = Uuid::new_v4().to_string();
        let result = self
            .http
            .post(format!("{}/session", self.base_url))
            .query(&[("delete", "true"), ("requestId", request_id.as_str())])
            .header("Authorization", format!("Snowflake Token=\"{}\"", self.token))
            .json(&serde_json::json!({}))
            .send()
            .await;
        if let Err(err) = result {
            debug!(error = %err, "session logout failed");
        }
    }

    async fn names_from_show(&self, sql: &str) -> Result<Vec<String>, ConnectionError> {
        let result = self.execute(sql).await?;
        if result.column_index("name").is_none() {
            return Err(ConnectionError::Protocol(format!(
                "result of '{}' has no name column",
                sql
            )));
        }
        Ok(result.column_values("name"))
    }
}

#[async_trait]
impl StatementExecutor for SnowflakeSession {
    async fn execute(&self, sql: &str) -> Result<QueryResult, ConnectionError> {
        SnowflakeSession::execute(self, sql).await
    }
}

// Manual Debug so the session token can never end up in logs.
impl std::fmt::Debug for SnowflakeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeSession")
            .field("account", &self.config.account)
            .field("user", &self.config.user)
            .field("token", &"***")
            .finish()
    }
}

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or("")
}

async fn truncated_body(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    let trimmed = body.trim();
    if trimmed.chars().count() > 300 {
        let mut cut: String = trimmed.chars().take(300).collect();
        cut.push_str("...");
        cut
    } else {
        trimmed.to_string()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    data: LoginRequestData<'a>,
}

#[derive(Serialize)]
struct LoginRequestData<'a> {
    #[serde(rename = "LOGIN_NAME")]
    login_name: &'a str,
    #[serde(rename = "PASSWORD")]
    password: &'a str,
    #[serde(rename = "ACCOUNT_NAME")]
    account_name: &'a str,
    #[serde(rename = "CLIENT_APP_ID")]
    client_app_id: &'a str,
    #[serde(rename = "CLIENT_APP_VERSION")]
    client_app_version: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: Option<LoginResponseData>,
    success: bool,
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponseData {
    token: Option<String>,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    #[serde(rename = "sqlText")]
    sql_text: &'a str,
    #[serde(rename = "asyncExec")]
    async_exec: bool,
    #[serde(rename = "sequenceId")]
    sequence_id: u64,
    #[serde(rename = "isInternal")]
    is_internal: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    data: Option<QueryResponseData>,
    success: bool,
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponseData {
    #[serde(default)]
    rowtype: Vec<RowType>,
    #[serde(default)]
    rowset: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RowType {
    name: String,
}

impl QueryResponseData {
    /// Flatten the wire shape into a [`QueryResult`]; every cell arrives as
    /// a JSON string or null.
    fn into_result(self) -> QueryResult {
        let columns = self.rowtype.into_iter().map(|c| c.name).collect();
        let rows = self
            .rowset
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        QueryResult { columns, rows }
    }
}

fn cell_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_uses_driver_field_names() {
        let request = LoginRequest {
            data: LoginRequestData {
                login_name: "analyst",
                password: "pw",
                account_name: "xy12345",
                client_app_id: CLIENT_APP_ID,
                client_app_version: "0.0.0",
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["data"]["LOGIN_NAME"], "analyst");
        assert_eq!(json["data"]["PASSWORD"], "pw");
        assert_eq!(json["data"]["ACCOUNT_NAME"], "xy12345");
        assert_eq!(json["data"]["CLIENT_APP_ID"], "snow2gcp");
    }

    #[test]
    fn test_query_request_uses_driver_field_names() {
        let request = QueryRequest {
            sql_text: "SHOW DATABASES",
            async_exec: false,
            sequence_id: 7,
            is_internal: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["sqlText"], "SHOW DATABASES");
        assert_eq!(json["asyncExec"], false);
        assert_eq!(json["sequenceId"], 7);
        assert_eq!(json["isInternal"], false);
    }

    #[test]
    fn test_login_failure_response_parses() {
        let raw = r#"{
            "data": null,
            "code": "390100",
            "message": "Incorrect username or password was specified.",
            "success": false
        }"#;
        let response: LoginResponse = serde_json::from_str(raw).unwrap();
        assert!(!response.success);
        assert_eq!(response.code.as_deref(), Some("390100"));
        assert!(response.message.unwrap().contains("Incorrect username"));
    }

    #[test]
    fn test_login_success_response_parses() {
        let raw = r#"{
            "data": {"token": "session-token-abc", "masterToken": "m", "sessionId": 123},
            "code": null,
            "message": null,
            "success": true
        }"#;
        let response: LoginResponse = serde_json::from_str(raw).unwrap();
        assert!(response.success);
        assert_eq!(response.data.unwrap().token.as_deref(), Some("session-token-abc"));
    }

    #[test]
    fn test_query_response_flattens_to_result() {
        let raw = r#"{
            "data": {
                "rowtype": [{"name": "name", "type": "text"}, {"name": "rows", "type": "fixed"}],
                "rowset": [["ORDERS", "42"], ["CUSTOMERS", null]],
                "queryId": "01b2"
            },
            "code": null,
            "message": null,
            "success": true
        }"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        let result = response.data.unwrap().into_result();
        assert_eq!(result.columns, vec!["name", "rows"]);
        assert_eq!(result.column_values("name"), vec!["ORDERS", "CUSTOMERS"]);
        assert_eq!(result.get(0, "rows"), Some("42"));
        assert_eq!(result.get(1, "rows"), None);
    }

    #[test]
    fn test_query_result_helpers_are_case_insensitive() {
        let result = QueryResult {
            columns: vec!["NAME".to_string()],
            rows: vec![vec![Some("PUBLIC".to_string())]],
        };
        assert_eq!(result.column_values("name"), vec!["PUBLIC"]);
        assert_eq!(result.first_value(), Some("PUBLIC"));
    }

    #[test]
    fn test_non_string_cells_stringify() {
        assert_eq!(cell_to_string(serde_json::json!(null)), None);
        assert_eq!(cell_to_string(serde_json::json!("x")), Some("x".to_string()));
        assert_eq!(cell_to_string(serde_json::json!(12)), Some("12".to_string()));
        assert_eq!(cell_to_string(serde_json::json!(true)), Some("true".to_string()));
    }
}
