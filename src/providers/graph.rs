use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::GraphConfig,
    core::errors::{AppError, AppResult},
    sync::m365::DirectorySource,
};

const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

const DEVICE_FIELDS: &str =
    "id,deviceName,serialNumber,operatingSystem,osVersion,model,manufacturer,userPrincipalName,lastSyncDateTime";
const USER_FIELDS: &str =
    "id,displayName,userPrincipalName,mail,jobTitle,department,accountEnabled";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDevice {
    pub id: String,
    pub device_name: Option<String>,
    pub serial_number: Option<String>,
    pub operating_system: Option<String>,
    pub os_version: Option<String>,
    pub model: Option<String>,
    pub manufacturer: Option<String>,
    pub user_principal_name: Option<String>,
    pub last_sync_date_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub mail: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub account_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrepaidUnits {
    pub enabled: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscribedSku {
    pub sku_id: String,
    pub sku_part_number: Option<String>,
    pub consumed_units: Option<i64>,
    pub prepaid_units: Option<PrepaidUnits>,
}

#[derive(Debug, Deserialize)]
struct GraphPage<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct GraphClient {
    http: reqwest::Client,
    config: GraphConfig,
    client_secret: String,
}

impl GraphClient {
    pub fn new(config: GraphConfig, client_secret: impl Into<String>) -> AppResult<Self> {
        if config.tenant_id.trim().is_empty() || config.client_id.trim().is_empty() {
            return Err(AppError::Config(
                "graph.tenant_id and graph.client_id must be set".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AppError::Network(err.to_string()))?;
        Ok(Self {
            http,
            config,
            client_secret: client_secret.into(),
        })
    }

    /// Client-credentials grant against the tenant's token endpoint.
    pub async fn acquire_token(&self) -> AppResult<String> {
        let endpoint = format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority.trim_end_matches('/'),
            self.config.tenant_id
        );
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", GRAPH_SCOPE),
            ("grant_type", "client_credentials"),
        ];
        let response = self
            .http
            .post(endpoint)
            .form(&form)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = check_status(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|err| AppError::GraphInvalidResponse(err.to_string()))?;
        if token.access_token.trim().is_empty() {
            return Err(AppError::GraphAuth);
        }
        Ok(token.access_token)
    }

    /// Fetches a collection, following `@odata.nextLink` up to the
    /// configured page cap.
    async fn get_collection<T: DeserializeOwned>(&self, token: &str, path: &str) -> AppResult<Vec<T>> {
        let url = format!("{}/{}", self.config.graph_base.trim_end_matches('/'), path);
        let (items, pages) = collect_pages(url, self.config.max_pages, |next| self.fetch_page(token, next)).await?;
        tracing::debug!(path, pages, count = items.len(), "graph collection fetched");
        Ok(items)
    }

    async fn fetch_page<T: DeserializeOwned>(&self, token: &str, url: String) -> AppResult<GraphPage<T>> {
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(map_send_error)?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|err| AppError::GraphInvalidResponse(err.to_string()))
    }
}

/// Drives `fetch` from `first_url` along `@odata.nextLink`, stopping after
/// `max_pages` pages. Returns the joined items and the page count.
async fn collect_pages<T, F, Fut>(first_url: String, max_pages: usize, mut fetch: F) -> AppResult<(Vec<T>, usize)>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = AppResult<GraphPage<T>>>,
{
    let mut url = first_url;
    let mut items = Vec::new();
    let mut pages = 0usize;

    loop {
        let page = fetch(url).await?;
        items.extend(page.value);
        pages += 1;

        match page.next_link {
            Some(next) if pages < max_pages => url = next,
            Some(_) => {
                tracing::warn!(pages, "graph page cap reached, results truncated");
                break;
            }
            None => break,
        }
    }
    Ok((items, pages))
}

fn map_send_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::GraphTimeout
    } else {
        AppError::Network(err.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppError::GraphAuth),
        StatusCode::BAD_REQUEST if response.url().path().ends_with("/token") => {
            Err(AppError::GraphAuth)
        }
        StatusCode::TOO_MANY_REQUESTS => Err(AppError::GraphRateLimited),
        status if !status.is_success() => {
            let body = response.text().await.unwrap_or_default();
            Err(AppError::GraphInvalidResponse(format!(
                "status {status} body {body}"
            )))
        }
        _ => Ok(response),
    }
}

#[async_trait]
impl DirectorySource for GraphClient {
    async fn authenticate(&self) -> AppResult<String> {
        self.acquire_token().await
    }

    async fn managed_devices(&self, token: &str) -> AppResult<Vec<ManagedDevice>> {
        self.get_collection(
            token,
            &format!("deviceManagement/managedDevices?$select={DEVICE_FIELDS}"),
        )
        .await
    }

    async fn users(&self, token: &str) -> AppResult<Vec<DirectoryUser>> {
        self.get_collection(token, &format!("users?$select={USER_FIELDS}"))
            .await
    }

    async fn subscribed_skus(&self, token: &str) -> AppResult<Vec<SubscribedSku>> {
        self.get_collection(token, "subscribedSkus").await
    }
}
