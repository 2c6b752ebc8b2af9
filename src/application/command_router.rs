use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::poll_agent::{PollAgent, PollTimer};
use super::state_cache::{self, SharedCache, StateCache};
use crate::api::{ApiError, RemoteAuthMethod, SabClient};
use crate::config::{AgentConfig, NzbNamePolicy};
use crate::notify::NotificationSink;
use crate::utils::{basename, truncate};

/// Longest download name shown in a notification
const NAME_DISPLAY_LEN: usize = 20;

/// Commands accepted from the embedding UI, tagged by `action`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    DownloadLink {
        link: String,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
    ReloadConfig,
    VerifyConnection,
    GetRemoteAuthMethod,
    GetCategories,
    GetOption {
        attribute: String,
    },
    GetQueue,
    GetHistory,
    GetSlots,
    GetSpeedHistory,
    PauseDownload {
        id: String,
    },
    ResumeDownload {
        id: String,
    },
    DeleteDownload {
        id: String,
    },
    MoveDownload {
        id: String,
        position: u32,
    },
    PauseAll,
    ResumeAll,
    DeleteAll,
    SetSpeedLimit {
        limit: u32,
    },
}

/// Dispatches UI commands onto the API client and the state cache.
///
/// Reads (`getQueue`, `getHistory`, `getSlots`, `getSpeedHistory`) are served
/// from the cache without touching the network. Mutations are fired without a
/// reply channel; their failures are logged and otherwise dropped. A few
/// mutations mirror their effect into the cache immediately rather than
/// waiting for the next poll.
pub struct CommandRouter {
    client: SabClient,
    cache: SharedCache,
    sink: Arc<dyn NotificationSink>,
    config: Arc<RwLock<AgentConfig>>,
    config_path: PathBuf,
    agent: Arc<PollAgent>,
    timer: Arc<Mutex<PollTimer>>,
}

impl CommandRouter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: SabClient,
        cache: SharedCache,
        sink: Arc<dyn NotificationSink>,
        config: Arc<RwLock<AgentConfig>>,
        config_path: PathBuf,
        agent: Arc<PollAgent>,
        timer: Arc<Mutex<PollTimer>>,
    ) -> Self {
        Self {
            client,
            cache,
            sink,
            config,
            config_path,
            agent,
            timer,
        }
    }

    /// Handles one command; `Some` carries the response for commands that
    /// expect one, fire-and-forget commands answer `None`.
    pub async fn handle(&self, command: Command) -> Option<Value> {
        match command {
            Command::DownloadLink {
                link,
                category,
                name,
            } => {
                self.download_link(link, category, name).await;
                None
            }

            Command::ReloadConfig => {
                self.reload_config().await;
                None
            }

            Command::VerifyConnection => Some(match self.client.verify_connection().await {
                Ok(_) => json!({ "ok": true }),
                Err(e) => {
                    debug!("connection check failed: {}", e);
                    json!({ "ok": false })
                }
            }),

            Command::GetRemoteAuthMethod => Some(match self.client.get_remote_auth_method().await {
                Ok(RemoteAuthMethod::None) => json!("none"),
                Ok(RemoteAuthMethod::ApiKey) => json!("apikey"),
                Ok(RemoteAuthMethod::Login) => json!("login"),
                Err(e) => {
                    debug!("auth method query failed: {}", e);
                    Value::Null
                }
            }),

            Command::GetCategories => Some(json!(self.categories().await)),

            Command::GetOption { attribute } => Some(self.config_value(&attribute)),

            Command::GetQueue => Some(json!(self.lock_cache().queue())),

            Command::GetHistory => Some(json!(self.lock_cache().history())),

            Command::GetSlots => Some(json!(self.lock_cache().queue().slots)),

            Command::GetSpeedHistory => Some(json!(self.lock_cache().speed_samples())),

            Command::PauseDownload { id } => {
                let client = self.client.clone();
                tokio::spawn(async move { log_outcome("pause", client.pause_download(&id).await) });
                None
            }

            Command::ResumeDownload { id } => {
                let client = self.client.clone();
                tokio::spawn(
                    async move { log_outcome("resume", client.resume_download(&id).await) },
                );
                None
            }

            Command::DeleteDownload { id } => {
                let client = self.client.clone();
                let remote_id = id.clone();
                tokio::spawn(
                    async move { log_outcome("delete", client.delete_download(&remote_id).await) },
                );

                if let Some(remaining) = self.lock_cache().forget_download(&id) {
                    self.sink.set_badge(Some(remaining));
                }
                None
            }

            Command::MoveDownload { id, position } => {
                let client = self.client.clone();
                tokio::spawn(async move {
                    log_outcome("move", client.move_download(&id, position).await)
                });
                None
            }

            Command::PauseAll => {
                let client = self.client.clone();
                tokio::spawn(async move { log_outcome("pause all", client.pause_all().await) });
                None
            }

            Command::ResumeAll => {
                let client = self.client.clone();
                tokio::spawn(async move { log_outcome("resume all", client.resume_all().await) });
                None
            }

            Command::DeleteAll => {
                let client = self.client.clone();
                tokio::spawn(async move { log_outcome("delete all", client.delete_all().await) });

                let mut cache = self.lock_cache();
                cache.clear_downloads();
                drop(cache);
                self.sink.set_badge(None);
                None
            }

            Command::SetSpeedLimit { limit } => {
                let client = self.client.clone();
                tokio::spawn(
                    async move { log_outcome("speed limit", client.set_speed_limit(limit).await) },
                );

                self.lock_cache().set_speed_limit_local(limit);
                None
            }
        }
    }

    async fn download_link(&self, link: String, category: Option<String>, name: Option<String>) {
        let base = basename(&link);
        let (name_policy, file_upload) = {
            let config = self.read_config();
            (config.nzb_name, config.file_upload)
        };

        // Without an explicit name the always-prompt policy defers the send
        // until the UI answers with one
        if name.is_none() && name_policy == NzbNamePolicy::Always {
            self.sink.prompt_name(&link, category.as_deref(), &base);
            return;
        }

        let name = name.unwrap_or(base);
        let result = if file_upload {
            self.client
                .send_file(&link, &name, category.as_deref())
                .await
        } else {
            self.client
                .send_link(&link, &name, category.as_deref())
                .await
                .map(|_| ())
        };

        match result {
            Ok(()) => self.sink.notify(
                "Download sent",
                &format!("Sent {} to SABnzbd", truncate(&name, NAME_DISPLAY_LEN)),
            ),
            Err(e) => {
                debug!("sending {} failed: {}", link, e);
                self.sink
                    .notify("Sending failed", "Could not send the download to SABnzbd");
            }
        }
    }

    /// Re-reads the configuration file, swaps credentials, refreshes the
    /// remote-derived category list and rearms the poll timer in case the
    /// interval changed.
    async fn reload_config(&self) {
        info!("reloading configuration");

        let next = match AgentConfig::load(&self.config_path) {
            Ok(next) => next,
            Err(e) => {
                debug!("configuration reload failed: {}", e);
                return;
            }
        };

        self.client.set_credentials(next.credentials());
        let interval = next.poll_interval();
        *self
            .config
            .write()
            .unwrap_or_else(|e| e.into_inner()) = next;

        self.refresh_categories().await;

        let agent = self.agent.clone();
        self.lock_timer().rearm(interval, move || {
            let agent = agent.clone();
            async move { agent.tick().await }
        });
    }

    async fn refresh_categories(&self) {
        if self.read_config().hide_categories {
            return;
        }
        let categories = self.client.get_categories().await;
        if !categories.is_empty() {
            self.sink.categories_changed(&categories);
        }
    }

    async fn categories(&self) -> Vec<String> {
        if self.read_config().hide_categories {
            return Vec::new();
        }
        self.client.get_categories().await
    }

    /// A stored configuration value by field name, `null` when unknown
    fn config_value(&self, attribute: &str) -> Value {
        serde_json::to_value(&*self.read_config())
            .ok()
            .and_then(|value| value.get(attribute).cloned())
            .unwrap_or(Value::Null)
    }

    fn lock_cache(&self) -> MutexGuard<'_, StateCache> {
        state_cache::lock(&self.cache)
    }

    fn lock_timer(&self) -> MutexGuard<'_, PollTimer> {
        self.timer.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_config(&self) -> std::sync::RwLockReadGuard<'_, AgentConfig> {
        self.config.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn log_outcome(operation: &'static str, result: Result<String, ApiError>) {
    if let Err(e) = result {
        debug!("{} failed: {}", operation, e);
    }
}
