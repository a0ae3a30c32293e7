use std::time::Duration;

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use futures::FutureExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, error};
use url::Url;

use super::types::{
  CurrentMetrics, GrowthMetrics, HardwareDistribution, MetricsTimeline, SyncHistory, SyncStatus,
  SyncTriggerResponse, University, UniversityHistoryEntry, UniversityList,
};
use super::{ApiError, ApiFuture, DashboardApi};
use crate::roster::RosterQuery;

/// HTTP client for the dashboard service
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
}

impl ApiClient {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let base =
      Url::parse(base_url).map_err(|e| eyre!("Invalid API base URL '{}': {}", base_url, e))?;
    if base.cannot_be_a_base() {
      return Err(eyre!("API base URL '{}' cannot carry a path", base_url));
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .default_headers(headers)
      .timeout(timeout)
      .user_agent(concat!("unidash/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  /// Append path segments to the base URL, escaping each one.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  async fn get<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(&str, String)],
  ) -> std::result::Result<T, ApiError> {
    let url = self.endpoint(segments);
    let request = self.http.get(url.clone()).query(query);
    self.send(&url, request).await
  }

  async fn post<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(&str, String)],
  ) -> std::result::Result<T, ApiError> {
    let url = self.endpoint(segments);
    let request = self.http.post(url.clone()).query(query);
    self.send(&url, request).await
  }

  /// Send a request and decode the JSON body. Every failure is logged here
  /// once, so callers only surface it.
  async fn send<T: DeserializeOwned>(
    &self,
    url: &Url,
    request: RequestBuilder,
  ) -> std::result::Result<T, ApiError> {
    debug!(%url, "API request");

    let result = Self::execute(request).await;
    if let Err(err) = &result {
      error!(%url, error = %err, "API request failed");
    }
    result
  }

  async fn execute<T: DeserializeOwned>(request: RequestBuilder) -> std::result::Result<T, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(ApiError::from_status(status.as_u16(), &body));
    }
    Ok(response.json::<T>().await?)
  }
}

/// Query parameters for the roster listing. Absent search is omitted.
fn roster_params(query: &RosterQuery) -> Vec<(&'static str, String)> {
  let mut params = Vec::with_capacity(3);
  if let Some(search) = &query.search {
    params.push(("search", search.clone()));
  }
  params.push(("sort_by", query.sort.as_param().to_string()));
  params.push(("has_tenstorrent", query.has_hardware.to_string()));
  params
}

impl DashboardApi for ApiClient {
  fn current_metrics(&self) -> ApiFuture<CurrentMetrics> {
    let client = self.clone();
    async move { client.get(&["metrics", "current"], &[]).await }.boxed()
  }

  fn timeline(&self, start_date: NaiveDate, end_date: NaiveDate) -> ApiFuture<MetricsTimeline> {
    let client = self.clone();
    async move {
      let params = [
        ("start_date", start_date.to_string()),
        ("end_date", end_date.to_string()),
      ];
      client.get(&["metrics", "timeline"], &params).await
    }
    .boxed()
  }

  fn growth(&self, period_days: u32) -> ApiFuture<GrowthMetrics> {
    let client = self.clone();
    async move {
      let params = [("period_days", period_days.to_string())];
      client.get(&["metrics", "growth"], &params).await
    }
    .boxed()
  }

  fn hardware_distribution(&self) -> ApiFuture<HardwareDistribution> {
    let client = self.clone();
    async move { client.get(&["metrics", "hardware-distribution"], &[]).await }.boxed()
  }

  fn universities(&self, query: &RosterQuery) -> ApiFuture<UniversityList> {
    let client = self.clone();
    let params = roster_params(query);
    // The service routes the listing with a trailing slash
    async move { client.get(&["universities", ""], &params).await }.boxed()
  }

  fn university(&self, id: &str) -> ApiFuture<University> {
    let client = self.clone();
    let id = id.to_string();
    async move { client.get(&["universities", &id], &[]).await }.boxed()
  }

  fn university_history(&self, id: &str, limit: u32) -> ApiFuture<Vec<UniversityHistoryEntry>> {
    let client = self.clone();
    let id = id.to_string();
    async move {
      let params = [("limit", limit.to_string())];
      client.get(&["universities", &id, "history"], &params).await
    }
    .boxed()
  }

  fn trigger_sync(&self, create_snapshot: bool) -> ApiFuture<SyncTriggerResponse> {
    let client = self.clone();
    async move {
      let params = [("create_snapshot", create_snapshot.to_string())];
      client.post(&["sync", "trigger"], &params).await
    }
    .boxed()
  }

  fn sync_status(&self) -> ApiFuture<SyncStatus> {
    let client = self.clone();
    async move { client.get(&["sync", "status"], &[]).await }.boxed()
  }

  fn sync_history(&self, limit: u32) -> ApiFuture<SyncHistory> {
    let client = self.clone();
    async move {
      let params = [("limit", limit.to_string())];
      client.get(&["sync", "history"], &params).await
    }
    .boxed()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::roster::SortField;

  fn client(base: &str) -> ApiClient {
    ApiClient::new(base, Duration::from_secs(5)).unwrap()
  }

  #[test]
  fn test_endpoint_appends_segments() {
    let api = client("http://localhost:8000/api/v1");
    assert_eq!(
      api.endpoint(&["metrics", "current"]).as_str(),
      "http://localhost:8000/api/v1/metrics/current"
    );

    let slashed = client("http://localhost:8000/api/v1/");
    assert_eq!(
      slashed.endpoint(&["sync", "status"]).as_str(),
      "http://localhost:8000/api/v1/sync/status"
    );
  }

  #[test]
  fn test_roster_endpoint_keeps_trailing_slash() {
    let api = client("http://localhost:8000/api/v1");
    assert_eq!(
      api.endpoint(&["universities", ""]).as_str(),
      "http://localhost:8000/api/v1/universities/"
    );
  }

  #[test]
  fn test_identifier_is_escaped() {
    let api = client("http://localhost:8000/api/v1");
    assert_eq!(
      api.endpoint(&["universities", "a/b c"]).as_str(),
      "http://localhost:8000/api/v1/universities/a%2Fb%20c"
    );
  }

  #[test]
  fn test_rejects_unusable_base() {
    assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
    assert!(ApiClient::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
  }

  #[test]
  fn test_roster_params() {
    let default = roster_params(&RosterQuery::default());
    assert_eq!(
      default,
      vec![
        ("sort_by", "researchers_count".to_string()),
        ("has_tenstorrent", "true".to_string()),
      ]
    );

    let searched = roster_params(&RosterQuery {
      search: Some("MIT".to_string()),
      sort: SortField::Name,
      has_hardware: false,
    });
    assert_eq!(searched[0], ("search", "MIT".to_string()));
    assert_eq!(searched[1], ("sort_by", "university_name".to_string()));
    assert_eq!(searched[2], ("has_tenstorrent", "false".to_string()));
  }
}
