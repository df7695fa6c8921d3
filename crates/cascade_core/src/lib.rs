use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::{EntityId, Level},
    error::ApiError,
    protocol::{CreateItemRequest, CreatedItem, OptionItem},
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

/// Label of the placeholder option representing "no selection".
pub const SENTINEL_LABEL: &str = "Select...";
/// Anti-forgery header sent on every create request.
pub const CSRF_HEADER: &str = "X-CSRFToken";

const VALIDATION_ALERT: &str = "Please select parent items and fill the name.";
const CREATE_FAILED_ALERT: &str = "Failed to save item.";

#[derive(Debug, Error)]
pub enum CreateItemError {
    #[error("required field `{0}` is empty")]
    EmptyField(&'static str),
    #[error("create rejected with status {status}: {}", .message.as_deref().unwrap_or("no error body"))]
    Rejected { status: u16, message: Option<String> },
    #[error("create request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Backend surface the controller talks to. Abstracted so controller logic
/// is testable without HTTP.
#[async_trait]
pub trait TaxonomyApi: Send + Sync {
    /// List the options for `level` under `parent_id` (ignored for the root
    /// level), in backend order.
    async fn fetch_options(
        &self,
        level: Level,
        parent_id: Option<EntityId>,
    ) -> Result<Vec<OptionItem>>;

    async fn create_item(&self, request: CreateItemRequest) -> Result<CreatedItem, CreateItemError>;
}

/// Creation dialog owned by the embedding UI; the controller only drives
/// its lifecycle.
pub trait CreateDialog: Send + Sync {
    fn close(&self);
    fn clear_inputs(&self);
}

/// Blocking user-facing notification, e.g. a modal alert.
pub trait AlertSink: Send + Sync {
    fn alert(&self, message: &str);
}

pub struct NullAlertSink;

impl AlertSink for NullAlertSink {
    fn alert(&self, _message: &str) {}
}

/// One rendered dropdown entry. `value == None` is the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Option<EntityId>,
    pub label: String,
}

impl SelectOption {
    pub fn sentinel() -> Self {
        Self {
            value: None,
            label: SENTINEL_LABEL.to_string(),
        }
    }

    fn from_item(item: &OptionItem) -> Self {
        Self {
            value: Some(item.id),
            label: item.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelPhase {
    Disabled,
    Loading,
    Populated,
}

/// Transient UI state of one level control, owned by the controller.
#[derive(Debug, Clone)]
pub struct LevelState {
    pub phase: LevelPhase,
    pub options: Vec<SelectOption>,
    pub selection: Option<EntityId>,
    fetch_seq: u64,
}

impl LevelState {
    fn new() -> Self {
        Self {
            phase: LevelPhase::Disabled,
            options: vec![SelectOption::sentinel()],
            selection: None,
            fetch_seq: 0,
        }
    }

    fn reset(&mut self) {
        self.phase = LevelPhase::Disabled;
        self.options = vec![SelectOption::sentinel()];
        self.selection = None;
    }
}

struct FormState {
    levels: [LevelState; 5],
}

impl FormState {
    fn new() -> Self {
        Self {
            levels: std::array::from_fn(|_| LevelState::new()),
        }
    }

    fn level(&self, level: Level) -> &LevelState {
        &self.levels[level.index()]
    }

    fn level_mut(&mut self, level: Level) -> &mut LevelState {
        &mut self.levels[level.index()]
    }
}

#[derive(Debug, Clone)]
pub enum CascadeEvent {
    OptionsReplaced {
        level: Level,
        options: Vec<SelectOption>,
    },
    LevelReset {
        level: Level,
    },
    ItemCreated {
        level: Level,
        item: CreatedItem,
    },
}

/// Controller for the cascading taxonomy form. Owns all per-level state
/// exclusively; the embedding UI observes it through the event stream and
/// the state accessors.
pub struct CascadeFormController {
    api: Arc<dyn TaxonomyApi>,
    alerts: Arc<dyn AlertSink>,
    dialogs: Mutex<HashMap<Level, Arc<dyn CreateDialog>>>,
    state: Mutex<FormState>,
    events: broadcast::Sender<CascadeEvent>,
}

impl CascadeFormController {
    pub fn new(api: Arc<dyn TaxonomyApi>) -> Arc<Self> {
        Self::new_with_surfaces(api, Arc::new(NullAlertSink))
    }

    pub fn new_with_surfaces(api: Arc<dyn TaxonomyApi>, alerts: Arc<dyn AlertSink>) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            api,
            alerts,
            dialogs: Mutex::new(HashMap::new()),
            state: Mutex::new(FormState::new()),
            events,
        })
    }

    /// Register the creation dialog handle for one level.
    pub async fn attach_dialog(&self, level: Level, dialog: Arc<dyn CreateDialog>) {
        self.dialogs.lock().await.insert(level, dialog);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<CascadeEvent> {
        self.events.subscribe()
    }

    /// Initial load: populate the top-level list. Read failures are logged
    /// and leave the level disabled.
    pub async fn start(&self) {
        self.refresh_level(Level::Course, None).await;
    }

    /// Record a selection change on `level`. Resets every level below in
    /// hierarchy order, then populates the immediate child when the new
    /// selection is non-empty.
    pub async fn select(&self, level: Level, selection: Option<EntityId>) {
        let reset_levels: Vec<Level> = {
            let mut state = self.state.lock().await;
            state.level_mut(level).selection = selection;
            for &below in level.descendants() {
                let below_state = state.level_mut(below);
                below_state.reset();
                // Invalidate any in-flight fetch for the reset level.
                below_state.fetch_seq += 1;
            }
            level.descendants().to_vec()
        };
        for reset in reset_levels {
            let _ = self.events.send(CascadeEvent::LevelReset { level: reset });
        }

        if let (Some(parent_id), Some(child)) = (selection, level.child()) {
            self.refresh_level(child, Some(parent_id)).await;
        }
    }

    /// Replace `level`'s option list from the backend. The fetch carries a
    /// per-level sequence number; a response that is no longer the latest
    /// issued for the level is discarded.
    async fn refresh_level(&self, level: Level, parent_id: Option<EntityId>) {
        let seq = {
            let mut state = self.state.lock().await;
            let level_state = state.level_mut(level);
            level_state.fetch_seq += 1;
            level_state.phase = LevelPhase::Loading;
            level_state.fetch_seq
        };

        match self.api.fetch_options(level, parent_id).await {
            Ok(items) => {
                let options = {
                    let mut state = self.state.lock().await;
                    let level_state = state.level_mut(level);
                    if level_state.fetch_seq != seq {
                        info!(level = %level, "discarding stale option response");
                        return;
                    }
                    let mut options = Vec::with_capacity(items.len() + 1);
                    options.push(SelectOption::sentinel());
                    options.extend(items.iter().map(SelectOption::from_item));
                    level_state.options = options.clone();
                    // An empty result still enables the control.
                    level_state.phase = LevelPhase::Populated;
                    options
                };
                let _ = self
                    .events
                    .send(CascadeEvent::OptionsReplaced { level, options });
            }
            Err(err) => {
                // Read-path failures are logged only; no alert is raised.
                error!(level = %level, "failed to fetch options: {err:#}");
                let mut state = self.state.lock().await;
                let level_state = state.level_mut(level);
                if level_state.fetch_seq == seq {
                    level_state.phase = LevelPhase::Disabled;
                }
            }
        }
    }

    /// Create a new entry at `level` named `name`, using the currently
    /// selected parent. Validation failures and rejected requests raise a
    /// blocking alert; on success the level's dialog is closed and its
    /// option list re-fetched.
    pub async fn create_item(&self, level: Level, name: &str) -> Result<(), CreateItemError> {
        let descriptor = level.descriptor();
        let parent_id = match descriptor.parent {
            Some(parent) => self.state.lock().await.level(parent).selection,
            None => None,
        };

        if name.is_empty() {
            self.alerts.alert(VALIDATION_ALERT);
            return Err(CreateItemError::EmptyField("name"));
        }
        if let Some(field) = descriptor.parent_field {
            if parent_id.is_none() {
                self.alerts.alert(VALIDATION_ALERT);
                return Err(CreateItemError::EmptyField(field));
            }
        }

        let request = CreateItemRequest {
            level,
            name: name.to_string(),
            parent_id,
        };
        match self.api.create_item(request).await {
            Ok(item) => {
                info!(level = %level, id = item.id.0, name = %item.name, "created taxonomy item");
                if let Some(dialog) = self.dialogs.lock().await.get(&level) {
                    dialog.close();
                    dialog.clear_inputs();
                }
                let _ = self.events.send(CascadeEvent::ItemCreated { level, item });
                // Parent-scoped refresh; for the root level this re-fetches
                // the unparameterized root list.
                self.refresh_level(level, parent_id).await;
                Ok(())
            }
            Err(err) => {
                error!(level = %level, "failed to create item: {err}");
                self.alerts.alert(CREATE_FAILED_ALERT);
                Err(err)
            }
        }
    }

    pub async fn level_state(&self, level: Level) -> LevelState {
        self.state.lock().await.level(level).clone()
    }

    pub async fn options(&self, level: Level) -> Vec<SelectOption> {
        self.state.lock().await.level(level).options.clone()
    }

    pub async fn selection(&self, level: Level) -> Option<EntityId> {
        self.state.lock().await.level(level).selection
    }

    pub async fn is_enabled(&self, level: Level) -> bool {
        self.state.lock().await.level(level).phase == LevelPhase::Populated
    }
}

/// reqwest-backed [`TaxonomyApi`] speaking the `/api/*` REST surface. The
/// anti-forgery token is supplied once at construction and reused for every
/// create request.
pub struct HttpTaxonomyApi {
    http: Client,
    server_url: String,
    csrf_token: String,
}

impl HttpTaxonomyApi {
    pub fn new(server_url: impl Into<String>, csrf_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.into(),
            csrf_token: csrf_token.into(),
        }
    }
}

#[async_trait]
impl TaxonomyApi for HttpTaxonomyApi {
    async fn fetch_options(
        &self,
        level: Level,
        parent_id: Option<EntityId>,
    ) -> Result<Vec<OptionItem>> {
        let path = level
            .descriptor()
            .read_path(parent_id)
            .ok_or_else(|| anyhow!("level {level} requires a parent selection"))?;
        let items = self
            .http
            .get(format!("{}{path}", self.server_url))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<OptionItem>>()
            .await
            .with_context(|| format!("invalid option payload from {path}"))?;
        Ok(items)
    }

    async fn create_item(&self, request: CreateItemRequest) -> Result<CreatedItem, CreateItemError> {
        let path = request.level.descriptor().create_path;
        let response = self
            .http
            .post(format!("{}{path}", self.server_url))
            .header(CSRF_HEADER, &self.csrf_token)
            .json(&request.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.json::<ApiError>().await.ok().map(|body| body.error);
            return Err(CreateItemError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<CreatedItem>().await?)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
