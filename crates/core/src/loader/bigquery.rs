//! BigQuery REST v2 client
//!
//! Dataset management plus Parquet load jobs from `gs://` URIs. A load is
//! submitted via `jobs.insert`, then polled until the job reports `DONE`;
//! the job's own `errorResult` is surfaced verbatim on failure.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::TableLoader;
use super::error::LoadError;
use crate::gcp::{BIGQUERY_SCOPE, GoogleAuth};

const API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Client for dataset management and Parquet load jobs.
pub struct BigQueryLoader {
    http: reqwest::Client,
    auth: GoogleAuth,
    project: String,
}

impl BigQueryLoader {
    pub fn new(auth: GoogleAuth, project: impl Into<String>) -> Result<Self, LoadError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(LoadError::from_reqwest)?;
        Ok(Self {
            http,
            auth,
            project: project.into(),
        })
    }

    /// The project the loader writes into.
    pub fn project(&self) -> &str {
        &self.project
    }

    async fn token(&self) -> Result<String, LoadError> {
        Ok(self.auth.token(&[BIGQUERY_SCOPE]).await?)
    }

    async fn dataset_exists(&self, dataset: &str) -> Result<bool, LoadError> {
        let url = format!("{}/projects/{}/datasets/{}", API_BASE, self.project, dataset);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token().await?)
            .send()
            .await
            .map_err(LoadError::from_reqwest)?;
        match response.status().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(api_error(status, response).await),
        }
    }

    async fn create_dataset(&self, dataset: &str) -> Result<(), LoadError> {
        let url = format!("{}/projects/{}/datasets", API_BASE, self.project);
        let body = DatasetInsert {
            dataset_reference: DatasetReference {
                project_id: &self.project,
                dataset_id: dataset,
            },
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token().await?)
            .json(&body)
            .send()
            .await
            .map_err(LoadError::from_reqwest)?;
        match response.status().as_u16() {
            200 => {
                info!(dataset, "dataset created");
                Ok(())
            }
            // Lost the race against a concurrent creator; the dataset exists.
            409 => Ok(()),
            status => Err(api_error(status, response).await),
        }
    }

    async fn insert_load_job(
        &self,
        dataset: &str,
        table: &str,
        source_uri: &str,
    ) -> Result<String, LoadError> {
        let url = format!("{}/projects/{}/jobs", API_BASE, self.project);
        let body = JobInsert {
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec![source_uri],
                    destination_table: TableReference {
                        project_id: &self.project,
                        dataset_id: dataset,
                        table_id: table,
                    },
                    source_format: "PARQUET",
                    write_disposition: "WRITE_TRUNCATE",
                },
            },
        };
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token().await?)
            .json(&body)
            .send()
            .await
            .map_err(LoadError::from_reqwest)?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(api_error(status, response).await);
        }
        let job: Job = response
            .json()
            .await
            .map_err(|e| LoadError::Protocol(format!("malformed job response: {}", e)))?;
        job.job_reference
            .and_then(|r| r.job_id)
            .ok_or_else(|| LoadError::Protocol("job insert returned no job id".to_string()))
    }

    async fn wait_for_job(&self, job_id: &str) -> Result<Option<u64>, LoadError> {
        let url = format!("{}/projects/{}/jobs/{}", API_BASE, self.project, job_id);
        loop {
            let response = self
                .http
                .get(&url)
                .bearer_auth(self.token().await?)
                .send()
                .await
                .map_err(LoadError::from_reqwest)?;
            let status = response.status().as_u16();
            if status != 200 {
                return Err(api_error(status, response).await);
            }
            let job: Job = response
                .json()
                .await
                .map_err(|e| LoadError::Protocol(format!("malformed job response: {}", e)))?;

            if let Some(outcome) = job_outcome(&job)? {
                return Ok(outcome);
            }

            debug!(job_id, "load job still running");
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl TableLoader for BigQueryLoader {
    async fn ensure_dataset(&self, dataset: &str) -> Result<(), LoadError> {
        if self.dataset_exists(dataset).await? {
            debug!(dataset, "dataset already exists");
            return Ok(());
        }
        self.create_dataset(dataset).await
    }

    async fn load_table(
        &self,
        dataset: &str,
        table: &str,
        source_uri: &str,
    ) -> Result<Option<u64>, LoadError> {
        let job_id = self.insert_load_job(dataset, table, source_uri).await?;
        debug!(job_id = %job_id, table, "load job submitted");
        self.wait_for_job(&job_id).await
    }
}

/// `Ok(Some(rows))` once the job is done, `Ok(None)` while it is running,
/// the job's `errorResult` otherwise.
fn job_outcome(job: &Job) -> Result<Option<Option<u64>>, LoadError> {
    let Some(status) = &job.status else {
        return Ok(None);
    };
    if let Some(error) = &status.error_result {
        return Err(LoadError::JobFailed {
            reason: error.reason.clone(),
            message: error
                .message
                .clone()
                .unwrap_or_else(|| "load job failed".to_string()),
        });
    }
    if status.state.as_deref() == Some("DONE") {
        return Ok(Some(output_rows(job)));
    }
    Ok(None)
}

fn output_rows(job: &Job) -> Option<u64> {
    job.statistics
        .as_ref()?
        .load
        .as_ref()?
        .output_rows
        .as_ref()?
        .parse()
        .ok()
}

async fn api_error(status: u16, response: reqwest::Response) -> LoadError {
    let body = response.text().await.unwrap_or_default();
    // Errors come wrapped as {"error": {"message": ...}}; fall back to raw text.
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or_else(|| body.trim().chars().take(300).collect());
    LoadError::Api { status, message }
}

#[derive(Serialize)]
struct DatasetInsert<'a> {
    #[serde(rename = "datasetReference")]
    dataset_reference: DatasetReference<'a>,
}

#[derive(Serialize)]
struct DatasetReference<'a> {
    #[serde(rename = "projectId")]
    project_id: &'a str,
    #[serde(rename = "datasetId")]
    dataset_id: &'a str,
}

#[derive(Serialize)]
struct JobInsert<'a> {
    configuration: JobConfiguration<'a>,
}

#[derive(Serialize)]
struct JobConfiguration<'a> {
    load: LoadConfiguration<'a>,
}

#[derive(Serialize)]
struct LoadConfiguration<'a> {
    #[serde(rename = "sourceUris")]
    source_uris: Vec<&'a str>,
    #[serde(rename = "destinationTable")]
    destination_table: TableReference<'a>,
    #[serde(rename = "sourceFormat")]
    source_format: &'a str,
    #[serde(rename = "writeDisposition")]
    write_disposition: &'a str,
}

#[derive(Serialize)]
struct TableReference<'a> {
    #[serde(rename = "projectId")]
    project_id: &'a str,
    #[serde(rename = "datasetId")]
    dataset_id: &'a str,
    #[serde(rename = "tableId")]
    table_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct Job {
    #[serde(rename = "jobReference")]
    job_reference: Option<JobReference>,
    status: Option<JobStatus>,
    statistics: Option<JobStatistics>,
}

#[derive(Debug, Deserialize)]
struct JobReference {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    state: Option<String>,
    #[serde(rename = "errorResult")]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobStatistics {
    load: Option<LoadStatistics>,
}

#[derive(Debug, Deserialize)]
struct LoadStatistics {
    #[serde(rename = "outputRows")]
    output_rows: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_job_body_uses_api_field_names() {
        let body = JobInsert {
            configuration: JobConfiguration {
                load: LoadConfiguration {
                    source_uris: vec!["gs://acme-bucket/public/orders/*.parquet"],
                    destination_table: TableReference {
                        project_id: "acme-dwh",
                        dataset_id: "analytics_public",
                        table_id: "orders",
                    },
                    source_format: "PARQUET",
                    write_disposition: "WRITE_TRUNCATE",
                },
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        let load = &json["configuration"]["load"];
        assert_eq!(load["sourceUris"][0], "gs://acme-bucket/public/orders/*.parquet");
        assert_eq!(load["destinationTable"]["projectId"], "acme-dwh");
        assert_eq!(load["destinationTable"]["datasetId"], "analytics_public");
        assert_eq!(load["destinationTable"]["tableId"], "orders");
        assert_eq!(load["sourceFormat"], "PARQUET");
        assert_eq!(load["writeDisposition"], "WRITE_TRUNCATE");
    }

    #[test]
    fn test_running_job_has_no_outcome() {
        let raw = r#"{
            "jobReference": {"jobId": "job_abc"},
            "status": {"state": "RUNNING"}
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert!(job_outcome(&job).unwrap().is_none());
    }

    #[test]
    fn test_done_job_reports_output_rows() {
        let raw = r#"{
            "jobReference": {"jobId": "job_abc"},
            "status": {"state": "DONE"},
            "statistics": {"load": {"outputRows": "52417"}}
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        assert_eq!(job_outcome(&job).unwrap(), Some(Some(52417)));
    }

    #[test]
    fn test_failed_job_surfaces_error_result() {
        let raw = r#"{
            "status": {
                "state": "DONE",
                "errorResult": {
                    "reason": "invalid",
                    "message": "Incompatible table partitioning specification."
                }
            }
        }"#;
        let job: Job = serde_json::from_str(raw).unwrap();
        let err = job_outcome(&job).unwrap_err();
        match err {
            LoadError::JobFailed { reason, message } => {
                assert_eq!(reason.as_deref(), Some("invalid"));
                assert!(message.contains("Incompatible table partitioning"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_api_error_body_parses() {
        let raw = r#"{"error": {"code": 404, "message": "Not found: Dataset acme:missing"}}"#;
        let body: ApiErrorBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.error.message.as_deref(), Some("Not found: Dataset acme:missing"));
    }
}
