//! HTTP client for the report backend.
//!
//! The backend stores occupancy snapshots under `/reports`. Calls are
//! one-shot: failures are returned as [`ReportsError`] and never retried.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::error::{ReportsError, ReportsResult};
use crate::models::{NewReport, Report};

pub struct ReportsClient {
    client: Client,
    base_url: Url,
}

impl ReportsClient {
    /// Build a client for `base_url`, e.g. `http://localhost:8080/api`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportsError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`ReportsError::InvalidBaseUrl`] if `base_url` does not
    /// parse.
    pub fn new(base_url: &str, timeout_secs: u64) -> ReportsResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("autolavado/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Exactly one trailing slash so joins append instead of replacing the
        // last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url =
            Url::parse(&normalised).map_err(|_| ReportsError::InvalidBaseUrl(base_url.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET /reports`
    pub async fn list(&self) -> ReportsResult<Vec<Report>> {
        let url = self.url("reports")?;
        let response = self.client.get(url.clone()).send().await?;
        let response = check_status(response, None).await?;
        parse_json(response, url.as_str()).await
    }

    /// `GET /reports/{id}`
    pub async fn get(&self, id: i64) -> ReportsResult<Report> {
        let url = self.url(&format!("reports/{id}"))?;
        let response = self.client.get(url.clone()).send().await?;
        let response = check_status(response, Some(id)).await?;
        parse_json(response, url.as_str()).await
    }

    /// `POST /reports`, returning the stored record.
    pub async fn create(&self, report: &NewReport) -> ReportsResult<Report> {
        let url = self.url("reports")?;
        let response = self.client.post(url.clone()).json(report).send().await?;
        let response = check_status(response, None).await?;
        let created: Report = parse_json(response, url.as_str()).await?;
        tracing::info!("Report {} saved", created.id);
        Ok(created)
    }

    /// `DELETE /reports/{id}`. Any 2xx counts as success.
    pub async fn delete(&self, id: i64) -> ReportsResult<()> {
        let url = self.url(&format!("reports/{id}"))?;
        let response = self.client.delete(url).send().await?;
        check_status(response, Some(id)).await?;
        tracing::info!("Report {} deleted", id);
        Ok(())
    }

    fn url(&self, path: &str) -> ReportsResult<Url> {
        self.base_url
            .join(path)
            .map_err(|_| ReportsError::InvalidBaseUrl(format!("{}{}", self.base_url, path)))
    }
}

async fn check_status(response: Response, id: Option<i64>) -> ReportsResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, id) {
        return Err(ReportsError::NotFound(id));
    }
    let body = response.text().await.unwrap_or_default();
    Err(ReportsError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn parse_json<T: DeserializeOwned>(response: Response, context: &str) -> ReportsResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| ReportsError::Deserialize {
        context: context.to_string(),
        source,
    })
}
