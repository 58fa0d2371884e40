//! [`VaultApi`] over the Obsidian Local REST API plugin.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use vaultpatch_config::{ENV_API_KEY, VaultConfig};

use crate::BoxFuture;
use crate::path::normalize;
use crate::secret::SecretValue;

use super::api::{VaultApi, VaultError};
use super::types::{ApiErrorBody, FileListing, Period, SearchHit};

const MARKDOWN: &str = "text/markdown";
const JSON_LOGIC: &str = "application/vnd.olrapi.jsonlogic+json";
const DATAVIEW_DQL: &str = "application/vnd.olrapi.dataview.dql+txt";

/// Transport settings for [`RestVaultClient`].
#[derive(Debug, Clone, Copy)]
pub struct ClientSettings {
    pub verify_ssl: bool,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            verify_ssl: false,
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(6),
        }
    }
}

pub struct RestVaultClient {
    client: Client,
    base_url: Url,
    api_key: SecretValue,
}

impl std::fmt::Debug for RestVaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestVaultClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key)
            .finish()
    }
}

impl RestVaultClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<SecretValue>,
        settings: ClientSettings,
    ) -> Result<Self, VaultError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(VaultError::Client(format!(
                "no API key configured: set {ENV_API_KEY} or vault.api_key"
            )));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| VaultError::Client(format!("invalid base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(VaultError::Client(format!("{base_url} cannot be used as a base URL")));
        }

        // The plugin serves a self-signed certificate by default.
        let client = Client::builder()
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| VaultError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn from_config(config: &VaultConfig) -> Result<Self, VaultError> {
        let settings = ClientSettings {
            verify_ssl: config.verify_ssl,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        };
        Self::new(
            &config.base_url(),
            config.api_key.clone().unwrap_or_default(),
            settings,
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `base/<segments...>[/]`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str], trailing_slash: bool) -> Result<Url, VaultError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                VaultError::Client(format!("{} cannot hold a path", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
            if trailing_slash {
                path.push("");
            }
        }
        Ok(url)
    }

    fn vault_url(&self, path: &str, is_dir: bool) -> Result<Url, VaultError> {
        let path = normalize(path);
        let mut segments = vec!["vault"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(&segments, is_dir)
    }

    fn file_url(&self, path: &str) -> Result<Url, VaultError> {
        if normalize(path).is_empty() {
            return Err(VaultError::InvalidRequest("file path must not be empty".into()));
        }
        self.vault_url(path, false)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, VaultError> {
        let response = request
            .header(AUTHORIZATION, self.api_key.bearer())
            .send()
            .await
            .map_err(|e| self.network_error(operation, &e))?;

        let status = response.status();
        debug!(operation, status = status.as_u16(), "vault request");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        let message = parsed.message.unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&body).trim().to_string();
            if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                text
            }
        });
        Err(VaultError::Api {
            status: status.as_u16(),
            code: parsed.error_code.unwrap_or(-1),
            message,
            operation,
            suggestion: suggestion_for(status, operation),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, VaultError> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| VaultError::Parse {
                operation,
                message: e.to_string(),
            })
    }

    async fn send_text(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<String, VaultError> {
        self.send(operation, request)
            .await?
            .text()
            .await
            .map_err(|e| VaultError::Parse {
                operation,
                message: e.to_string(),
            })
    }

    fn network_error(&self, operation: &'static str, err: &reqwest::Error) -> VaultError {
        let hint = if err.is_connect() {
            Some(format!(
                "Is Obsidian running with the Local REST API plugin enabled at {}?",
                self.base_url
            ))
        } else if err.is_timeout() {
            Some("Obsidian did not answer in time; check that it is not blocked".to_string())
        } else {
            None
        };
        VaultError::Network {
            operation,
            message: err.to_string(),
            hint,
        }
    }
}

fn suggestion_for(status: StatusCode, operation: &str) -> Option<String> {
    let text = match status.as_u16() {
        401 | 403 => "Check that the API key matches the one in the Local REST API plugin settings",
        404 => match operation {
            "list_files" => "Check that the directory exists in the vault",
            "periodic_note" | "recent_periodic_notes" => {
                "Check that periodic notes are enabled for this period"
            }
            "put_file" | "append_file" => "Check that the parent directory exists",
            _ => "Check that the file exists and the path is relative to the vault root",
        },
        400 => "Check the request arguments",
        405 => "The Local REST API plugin does not support this operation; update the plugin",
        _ => return None,
    };
    Some(text.to_string())
}

impl VaultApi for RestVaultClient {
    fn list_files<'a>(&'a self, dir: Option<&'a str>) -> BoxFuture<'a, Result<Vec<String>, VaultError>> {
        Box::pin(async move {
            let url = self.vault_url(dir.unwrap_or(""), true)?;
            let listing: FileListing = self.send_json("list_files", self.client.get(url)).await?;
            Ok(listing.files)
        })
    }

    fn get_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, VaultError>> {
        Box::pin(async move {
            let url = self.file_url(path)?;
            self.send_text("get_file", self.client.get(url)).await
        })
    }

    fn put_file<'a>(&'a self, path: &'a str, content: &'a str) -> BoxFuture<'a, Result<(), VaultError>> {
        Box::pin(async move {
            let url = self.file_url(path)?;
            let request = self
                .client
                .put(url)
                .header(CONTENT_TYPE, MARKDOWN)
                .body(content.to_string());
            self.send("put_file", request).await.map(drop)
        })
    }

    fn append_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), VaultError>> {
        Box::pin(async move {
            let url = self.file_url(path)?;
            let request = self
                .client
                .post(url)
                .header(CONTENT_TYPE, MARKDOWN)
                .body(content.to_string());
            self.send("append_file", request).await.map(drop)
        })
    }

    fn delete_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), VaultError>> {
        Box::pin(async move {
            let url = self.file_url(path)?;
            self.send("delete_file", self.client.delete(url)).await.map(drop)
        })
    }

    fn simple_search<'a>(
        &'a self,
        query: &'a str,
        context_length: u32,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>, VaultError>> {
        Box::pin(async move {
            let url = self.endpoint(&["search", "simple"], true)?;
            let request = self.client.post(url).query(&[
                ("query", query.to_string()),
                ("contextLength", context_length.to_string()),
            ]);
            self.send_json("simple_search", request).await
        })
    }

    fn search_json_logic<'a>(&'a self, query: &'a Value) -> BoxFuture<'a, Result<Value, VaultError>> {
        Box::pin(async move {
            let url = self.endpoint(&["search"], true)?;
            let body = serde_json::to_vec(query)
                .map_err(|e| VaultError::InvalidRequest(format!("unserializable query: {e}")))?;
            let request = self.client.post(url).header(CONTENT_TYPE, JSON_LOGIC).body(body);
            self.send_json("search_json_logic", request).await
        })
    }

    fn search_dql<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Value, VaultError>> {
        Box::pin(async move {
            let url = self.endpoint(&["search"], true)?;
            let request = self
                .client
                .post(url)
                .header(CONTENT_TYPE, DATAVIEW_DQL)
                .body(query.to_string());
            self.send_json("search_dql", request).await
        })
    }

    fn periodic_note(&self, period: Period) -> BoxFuture<'_, Result<String, VaultError>> {
        Box::pin(async move {
            let url = self.endpoint(&["periodic", period.as_str()], true)?;
            self.send_text("periodic_note", self.client.get(url)).await
        })
    }

    fn recent_periodic_notes(
        &self,
        period: Period,
        limit: u32,
        include_content: bool,
    ) -> BoxFuture<'_, Result<Value, VaultError>> {
        Box::pin(async move {
            let url = self.endpoint(&["periodic", period.as_str(), "recent"], false)?;
            let request = self.client.get(url).query(&[
                ("limit", limit.to_string()),
                ("includeContent", include_content.to_string()),
            ]);
            self.send_json("recent_periodic_notes", request).await
        })
    }
}
