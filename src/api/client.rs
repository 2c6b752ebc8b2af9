use std::sync::{Arc, RwLock, RwLockReadGuard};

use reqwest::multipart;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::models::{History, HistoryResponse, Queue, QueueResponse, QueueSlot};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("server returned HTTP {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// How requests authenticate against the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    ApiKey(String),
    Login { username: String, password: String },
}

/// Endpoint host plus the active authentication mode.
/// Replaced wholesale on a configuration reload.
#[derive(Debug, Clone)]
pub struct Credentials {
    host: String,
    pub auth: AuthMode,
}

impl Credentials {
    pub fn new(host: &str, auth: AuthMode) -> Self {
        let mut host = host.to_string();
        if !host.ends_with('/') {
            host.push('/');
        }
        Self { host, auth }
    }

    /// Host with a guaranteed trailing slash
    pub fn host(&self) -> &str {
        &self.host
    }

    fn api_url(&self) -> String {
        format!("{}api", self.host)
    }

    fn auth_params(&self) -> Vec<(&'static str, String)> {
        match &self.auth {
            AuthMode::ApiKey(key) => vec![("apikey", key.clone())],
            AuthMode::Login { username, password } => vec![
                ("ma_username", username.clone()),
                ("ma_password", password.clone()),
            ],
        }
    }
}

/// Authentication scheme enforced by the remote server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAuthMethod {
    None,
    ApiKey,
    Login,
}

/// Client for the SABnzbd HTTP API.
///
/// All operations are async and report errors through their `Result`; nothing
/// is retried here. Credentials can be swapped at runtime without rebuilding
/// the client.
#[derive(Clone)]
pub struct SabClient {
    http: Client,
    credentials: Arc<RwLock<Credentials>>,
}

impl SabClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            http: Client::new(),
            credentials: Arc::new(RwLock::new(credentials)),
        }
    }

    /// Replaces host and auth mode in one step
    pub fn set_credentials(&self, credentials: Credentials) {
        *self
            .credentials
            .write()
            .unwrap_or_else(|e| e.into_inner()) = credentials;
    }

    pub fn credentials(&self) -> Credentials {
        self.read_credentials().clone()
    }

    fn read_credentials(&self) -> RwLockReadGuard<'_, Credentials> {
        self.credentials.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Sends a GET request to the `api` endpoint and returns the raw body.
    /// Auth parameters are appended unless `with_auth` is false.
    async fn request(&self, params: Vec<(&str, String)>, with_auth: bool) -> Result<String> {
        let (url, query) = {
            let credentials = self.read_credentials();
            let mut query = params;
            if with_auth {
                query.extend(credentials.auth_params());
            }
            (credentials.api_url(), query)
        };

        let response = self.http.get(&url).query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// See `request`; additionally asks for and decodes a JSON body
    async fn json_request<T: DeserializeOwned>(&self, mut params: Vec<(&str, String)>) -> Result<T> {
        params.push(("output", "json".to_string()));
        let body = self.request(params, true).await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))
    }

    /// Fetches an arbitrary document with a plain GET, no auth involved
    async fn fetch_document(&self, link: &str) -> Result<String> {
        let response = self.http.get(link).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::ServerError {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// Sends a URL to the server for download.
    ///
    /// The server acknowledges with a bare `ok` body; anything else is an
    /// [`ApiError::UnexpectedReply`]. Category may be `None` or empty for
    /// "no category".
    pub async fn send_link(&self, link: &str, name: &str, category: Option<&str>) -> Result<String> {
        require("link", link)?;
        require("name", name)?;

        let mut params = vec![
            ("mode", "addurl".to_string()),
            ("name", link.to_string()),
            ("nzbname", name.to_string()),
        ];
        if let Some(cat) = category.filter(|c| !c.is_empty()) {
            params.push(("cat", cat.to_string()));
        }

        let body = self.request(params, true).await?;

        // The acknowledgement carries one trailing newline; strip exactly one
        if body.replacen('\n', "", 1) == "ok" {
            Ok(body)
        } else {
            Err(ApiError::UnexpectedReply(body))
        }
    }

    /// Fetches `link` and uploads it to the server as an NZB file.
    ///
    /// The fetched document must look like an NZB (`<!doctype nzb` or `<nzb`
    /// marker, case-insensitive) or the upload is never attempted. Success is
    /// an HTTP 200 on the multipart POST.
    pub async fn send_file(&self, link: &str, name: &str, category: Option<&str>) -> Result<()> {
        require("link", link)?;
        require("name", name)?;

        let document = self.fetch_document(link).await?;

        let lowered = document.to_lowercase();
        if !lowered.contains("<!doctype nzb") && !lowered.contains("<nzb") {
            return Err(ApiError::UnexpectedReply(format!(
                "{} is not a valid NZB file",
                link
            )));
        }

        let nzbfile = multipart::Part::text(document)
            .file_name(name.to_string())
            .mime_str("text/xml")?;

        let (url, form) = {
            let credentials = self.read_credentials();
            let mut form = multipart::Form::new()
                .part("nzbfile", nzbfile)
                .text("mode", "addfile")
                .text("nzbname", name.to_string());
            for (key, value) in credentials.auth_params() {
                form = form.text(key, value);
            }
            if let Some(cat) = category.filter(|c| !c.is_empty()) {
                form = form.text("cat", cat.to_string());
            }
            (credentials.api_url(), form)
        };

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::ServerError {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }

    /// Verifies connectivity and credentials with a queue query.
    ///
    /// The server answers auth failures with HTTP 200 and a body carrying
    /// `"status":false`; only that marker (or a transport/server error) counts
    /// as failure. A malformed 200 body without the marker is still success.
    pub async fn verify_connection(&self) -> Result<String> {
        let params = vec![
            ("mode", "queue".to_string()),
            ("output", "json".to_string()),
        ];
        let body = self.request(params, true).await?;

        if body.contains(r#""status":false"#) {
            Err(ApiError::UnexpectedReply(body))
        } else {
            Ok(body)
        }
    }

    /// Asks the server which authentication scheme it enforces.
    ///
    /// This is the one call that must not carry auth parameters. Since
    /// SABnzbd 0.7 the `key` parameter is still required when key auth is
    /// enabled, otherwise the server answers "badkey".
    pub async fn get_remote_auth_method(&self) -> Result<RemoteAuthMethod> {
        let mut params = vec![("mode", "auth".to_string())];
        {
            let credentials = self.read_credentials();
            if let AuthMode::ApiKey(key) = &credentials.auth {
                params.push(("key", key.clone()));
            }
        }

        let body = self.request(params, false).await?;

        match body.replacen('\n', "", 1).to_lowercase().as_str() {
            "none" => Ok(RemoteAuthMethod::None),
            "apikey" => Ok(RemoteAuthMethod::ApiKey),
            "login" => Ok(RemoteAuthMethod::Login),
            _ => Err(ApiError::UnexpectedReply(body)),
        }
    }

    /// Configured categories, without the `*` wildcard.
    /// Swallows every failure and returns an empty list instead.
    pub async fn get_categories(&self) -> Vec<String> {
        match self
            .json_request::<QueueResponse>(vec![("mode", "queue".to_string())])
            .await
        {
            Ok(response) => response
                .queue
                .categories
                .into_iter()
                .filter(|c| c != "*")
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn get_queue(&self) -> Result<Queue> {
        let response: QueueResponse = self
            .json_request(vec![("mode", "queue".to_string())])
            .await?;
        Ok(response.queue)
    }

    /// History listing, most recent first, optionally bounded to `limit` entries
    pub async fn get_history(&self, limit: Option<u32>) -> Result<History> {
        let mut params = vec![("mode", "history".to_string())];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let response: HistoryResponse = self.json_request(params).await?;
        Ok(response.history)
    }

    /// Queued downloads, projected out of the queue snapshot
    pub async fn get_slots(&self) -> Result<Vec<QueueSlot>> {
        Ok(self.get_queue().await?.slots)
    }

    async fn queue_action(&self, name: &str, value: &str) -> Result<String> {
        self.request(
            vec![
                ("mode", "queue".to_string()),
                ("name", name.to_string()),
                ("value", value.to_string()),
            ],
            true,
        )
        .await
    }

    pub async fn pause_download(&self, id: &str) -> Result<String> {
        require("id", id)?;
        self.queue_action("pause", id).await
    }

    pub async fn resume_download(&self, id: &str) -> Result<String> {
        require("id", id)?;
        self.queue_action("resume", id).await
    }

    pub async fn delete_download(&self, id: &str) -> Result<String> {
        require("id", id)?;
        self.queue_action("delete", id).await
    }

    pub async fn pause_all(&self) -> Result<String> {
        self.request(vec![("mode", "pause".to_string())], true).await
    }

    pub async fn resume_all(&self) -> Result<String> {
        self.request(vec![("mode", "resume".to_string())], true).await
    }

    pub async fn delete_all(&self) -> Result<String> {
        self.queue_action("delete", "all").await
    }

    /// Moves a download to a zero-based slot position
    pub async fn move_download(&self, id: &str, position: u32) -> Result<String> {
        require("id", id)?;
        self.request(
            vec![
                ("mode", "switch".to_string()),
                ("value", id.to_string()),
                ("value2", position.to_string()),
            ],
            true,
        )
        .await
    }

    /// Sets the global speed limit in kB/s
    pub async fn set_speed_limit(&self, limit: u32) -> Result<String> {
        self.request(
            vec![
                ("mode", "config".to_string()),
                ("name", "speedlimit".to_string()),
                ("value", limit.to_string()),
            ],
            true,
        )
        .await
    }
}

/// Argument validation happens before any network activity
fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ApiError::InvalidArguments(format!(
            "{} must not be empty",
            field
        )))
    } else {
        Ok(())
    }
}
