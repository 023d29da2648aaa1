use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use shared::domain::{normalize_directory, Category, Item};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    backend::{CategorizedItem, ReviewBackend},
    error::{ClientError, ClientResult},
    keymap::{action_for_key, ReviewAction, ReviewKey},
    notify::{NoticeContext, Notifier},
    upload::UploadCompletion,
    BusyGuard, InFlightGuard,
};

const MIN_ZOOM_TENTHS: u8 = 2;
const MAX_ZOOM_TENTHS: u8 = 30;
const DEFAULT_ZOOM_TENTHS: u8 = 10;

/// Zoom factor kept in tenths so every step is exactly 0.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomLevel(u8);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(MIN_ZOOM_TENTHS);
    pub const MAX: ZoomLevel = ZoomLevel(MAX_ZOOM_TENTHS);

    pub fn factor(self) -> f32 {
        f32::from(self.0) / 10.0
    }

    pub fn tenths(self) -> u8 {
        self.0
    }

    pub fn percent(self) -> u16 {
        u16::from(self.0) * 10
    }

    pub fn zoom_in(&mut self) -> bool {
        if self.0 >= MAX_ZOOM_TENTHS {
            return false;
        }
        self.0 += 1;
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if self.0 <= MIN_ZOOM_TENTHS {
            return false;
        }
        self.0 -= 1;
        true
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        ZoomLevel(DEFAULT_ZOOM_TENTHS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loaded {
    Ready { count: usize },
    /// A newer load was issued before this one's listing arrived.
    Superseded,
    /// `reload` with nothing loaded yet.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Moved { cursor: usize },
    /// Empty session, or already at the first/last image.
    AtBoundary,
    /// Forward step refused because the image under the cursor has no
    /// category yet.
    CategorizationRequired { display_name: String },
}

impl Step {
    pub fn moved(&self) -> bool {
        matches!(self, Step::Moved { .. })
    }

    pub fn gate_violation(&self) -> Option<ClientError> {
        match self {
            Step::CategorizationRequired { display_name } => {
                Some(ClientError::CategorizationRequired {
                    display_name: display_name.clone(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Categorized(Category),
    Stepped(Step),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadStatus {
    Reloaded { remaining: usize },
    /// Another load was requested, or had already landed, while the save ran.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub categorized_count: usize,
    pub destination_folder: String,
    pub reload: ReloadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Browsing { cursor: usize, gate_open: bool },
}

#[derive(Debug, Default)]
struct SessionState {
    source_path: Option<String>,
    items: Vec<Item>,
    cursor: usize,
    categories: HashMap<String, Category>,
    zoom: ZoomLevel,
}

impl SessionState {
    fn loaded(source_path: String, items: Vec<Item>) -> Self {
        Self {
            source_path: Some(source_path),
            items,
            ..Self::default()
        }
    }

    fn current(&self) -> Option<&Item> {
        self.items.get(self.cursor)
    }

    fn current_category(&self) -> Option<Category> {
        self.current()
            .and_then(|item| self.categories.get(&item.display_name).copied())
    }

    fn categorized_in_order(&self) -> Vec<CategorizedItem> {
        self.items
            .iter()
            .filter_map(|item| {
                self.categories
                    .get(&item.display_name)
                    .map(|category| CategorizedItem {
                        item: item.clone(),
                        category: *category,
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub source_path: Option<String>,
    pub items: Vec<Item>,
    pub cursor: usize,
    pub categories: HashMap<String, Category>,
    pub zoom: ZoomLevel,
    pub loading: bool,
    pub committing: bool,
}

impl SessionSnapshot {
    pub fn current_item(&self) -> Option<&Item> {
        self.items.get(self.cursor)
    }

    pub fn category_of(&self, display_name: &str) -> Option<Category> {
        self.categories.get(display_name).copied()
    }

    pub fn current_category(&self) -> Option<Category> {
        self.current_item()
            .and_then(|item| self.category_of(&item.display_name))
    }

    pub fn phase(&self) -> SessionPhase {
        if self.items.is_empty() {
            SessionPhase::Empty
        } else {
            SessionPhase::Browsing {
                cursor: self.cursor,
                gate_open: self.current_category().is_some(),
            }
        }
    }

    pub fn position(&self) -> Option<(usize, usize)> {
        (!self.items.is_empty()).then(|| (self.cursor + 1, self.items.len()))
    }

    pub fn progress_percent(&self) -> u8 {
        match self.position() {
            Some((position, total)) => ((position * 100) / total) as u8,
            None => 0,
        }
    }

    pub fn can_go_previous(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.cursor + 1 < self.items.len() && self.current_category().is_some()
    }

    pub fn categorized_count(&self) -> usize {
        self.categories.len()
    }

    pub fn is_complete(&self) -> bool {
        !self.items.is_empty()
            && self
                .items
                .iter()
                .all(|item| self.categories.contains_key(&item.display_name))
    }

    pub fn zoom_factor(&self) -> f32 {
        self.zoom.factor()
    }
}

pub struct ReviewSession {
    backend: Arc<dyn ReviewBackend>,
    notifier: Notifier,
    inner: Mutex<SessionState>,
    latest_load: AtomicU64,
    loads_in_flight: AtomicUsize,
    committing: AtomicBool,
}

impl ReviewSession {
    pub fn new(backend: Arc<dyn ReviewBackend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            inner: Mutex::new(SessionState::default()),
            latest_load: AtomicU64::new(0),
            loads_in_flight: AtomicUsize::new(0),
            committing: AtomicBool::new(false),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            source_path: guard.source_path.clone(),
            items: guard.items.clone(),
            cursor: guard.cursor,
            categories: guard.categories.clone(),
            zoom: guard.zoom,
            loading: self.loads_in_flight.load(Ordering::SeqCst) > 0,
            committing: self.committing.load(Ordering::SeqCst),
        }
    }

    /// Replaces the session with the images of `path`.
    ///
    /// An empty folder is adopted as an empty session and reported as
    /// [`ClientError::EmptyFolder`]. A listing failure leaves the current
    /// session untouched.
    pub async fn load(&self, path: &str) -> ClientResult<Loaded> {
        let ticket = self.latest_load.fetch_add(1, Ordering::SeqCst) + 1;
        self.load_with_ticket(normalize_directory(path), ticket).await
    }

    async fn load_with_ticket(&self, path: String, ticket: u64) -> ClientResult<Loaded> {
        let _busy = BusyGuard::enter(&self.loads_in_flight);
        let listing = self.backend.list_items(&path).await;

        let mut state = self.inner.lock().await;
        if self.latest_load.load(Ordering::SeqCst) != ticket {
            debug!(ticket, path = %path, "dropping superseded image listing");
            return Ok(Loaded::Superseded);
        }
        match listing {
            Ok(items) => {
                let count = items.len();
                *state = SessionState::loaded(path.clone(), items);
                drop(state);
                info!(path = %path, count, "loaded review session");
                if count == 0 {
                    return Err(self.fail(NoticeContext::Load, ClientError::EmptyFolder { path }));
                }
                Ok(Loaded::Ready { count })
            }
            Err(source) => {
                drop(state);
                Err(self.fail(NoticeContext::Load, ClientError::Listing { path, source }))
            }
        }
    }

    pub async fn reload(&self) -> ClientResult<Loaded> {
        let source_path = self.inner.lock().await.source_path.clone();
        match source_path {
            Some(path) => self.load(&path).await,
            None => Ok(Loaded::Idle),
        }
    }

    pub async fn categorize(&self, label: &str) -> ClientResult<Category> {
        match label.parse::<Category>() {
            Ok(category) => self.set_category(category).await,
            Err(_) => Err(self.fail(
                NoticeContext::Review,
                ClientError::InvalidCategory {
                    label: label.to_string(),
                },
            )),
        }
    }

    pub async fn set_category(&self, category: Category) -> ClientResult<Category> {
        let mut state = self.inner.lock().await;
        let Some(display_name) = state.current().map(|item| item.display_name.clone()) else {
            drop(state);
            return Err(self.fail(NoticeContext::Review, ClientError::NoCurrentItem));
        };
        debug!(item = %display_name, category = %category, "categorized");
        state.categories.insert(display_name, category);
        Ok(category)
    }

    pub async fn next(&self) -> Step {
        let mut state = self.inner.lock().await;
        if state.cursor + 1 >= state.items.len() {
            return Step::AtBoundary;
        }
        if state.current_category().is_none() {
            let display_name = state
                .current()
                .map(|item| item.display_name.clone())
                .unwrap_or_default();
            drop(state);
            let step = Step::CategorizationRequired { display_name };
            if let Some(violation) = step.gate_violation() {
                self.notifier.error(NoticeContext::Review, &violation);
            }
            return step;
        }
        state.cursor += 1;
        state.zoom = ZoomLevel::default();
        Step::Moved {
            cursor: state.cursor,
        }
    }

    /// Moves back one image; never gated.
    pub async fn previous(&self) -> Step {
        let mut state = self.inner.lock().await;
        if state.cursor == 0 {
            return Step::AtBoundary;
        }
        state.cursor -= 1;
        state.zoom = ZoomLevel::default();
        Step::Moved {
            cursor: state.cursor,
        }
    }

    pub async fn zoom_in(&self) -> ZoomLevel {
        let mut state = self.inner.lock().await;
        state.zoom.zoom_in();
        state.zoom
    }

    pub async fn zoom_out(&self) -> ZoomLevel {
        let mut state = self.inner.lock().await;
        state.zoom.zoom_out();
        state.zoom
    }

    pub async fn is_complete(&self) -> bool {
        self.snapshot().await.is_complete()
    }

    pub async fn perform(&self, action: ReviewAction) -> ClientResult<ActionOutcome> {
        match action {
            ReviewAction::Categorize(category) => {
                self.set_category(category).await.map(ActionOutcome::Categorized)
            }
            ReviewAction::Previous => Ok(ActionOutcome::Stepped(self.previous().await)),
            ReviewAction::Next => Ok(ActionOutcome::Stepped(self.next().await)),
        }
    }

    pub async fn handle_key(&self, key: ReviewKey) -> Option<ClientResult<ActionOutcome>> {
        match action_for_key(key) {
            Some(action) => Some(self.perform(action).await),
            None => None,
        }
    }

    pub async fn current_image_bytes(&self) -> ClientResult<Option<Vec<u8>>> {
        let key = {
            let state = self.inner.lock().await;
            match state.current() {
                Some(item) => item.identifier.clone(),
                None => return Ok(None),
            }
        };
        match self.backend.fetch_image_bytes(&key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(source) => Err(self.fail(
                NoticeContext::Review,
                ClientError::ImageFetch { key, source },
            )),
        }
    }

    /// Sends every categorization to the server, then reloads the folder.
    ///
    /// On a save failure the session, categorizations included, is left as
    /// it was so the call can simply be retried.
    pub async fn commit(&self) -> ClientResult<CommitReport> {
        let Some(_in_flight) = InFlightGuard::try_acquire(&self.committing) else {
            return Err(self.fail(NoticeContext::Commit, ClientError::CommitInFlight));
        };

        let (source_folder, batch, load_ticket) = {
            let state = self.inner.lock().await;
            if state.categories.is_empty() {
                drop(state);
                return Err(self.fail(NoticeContext::Commit, ClientError::NothingToSave));
            }
            (
                state.source_path.clone().unwrap_or_default(),
                state.categorized_in_order(),
                self.latest_load.load(Ordering::SeqCst),
            )
        };

        let response = match self.backend.save_categorized(&source_folder, &batch).await {
            Ok(response) => response,
            Err(source) => {
                return Err(self.fail(
                    NoticeContext::Commit,
                    ClientError::Save {
                        source_folder,
                        source,
                    },
                ));
            }
        };
        self.notifier.success(
            NoticeContext::Commit,
            format!(
                "Successfully saved {} images to {}",
                response.categorized_count, response.destination_folder
            ),
        );

        // Reload only when no other load was issued while the save ran.
        let reload_ticket = {
            let state = self.inner.lock().await;
            let still_showing = state.source_path.as_deref() == Some(source_folder.as_str());
            let claimed = still_showing
                && self
                    .latest_load
                    .compare_exchange(
                        load_ticket,
                        load_ticket + 1,
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_ok();
            claimed.then_some(load_ticket + 1)
        };
        let reload = if let Some(ticket) = reload_ticket {
            match self.load_with_ticket(source_folder.clone(), ticket).await {
                Ok(Loaded::Ready { count }) => ReloadStatus::Reloaded { remaining: count },
                Err(ClientError::EmptyFolder { .. }) => ReloadStatus::Reloaded { remaining: 0 },
                Ok(Loaded::Superseded | Loaded::Idle) => ReloadStatus::Skipped,
                Err(err) => ReloadStatus::Failed(err.to_string()),
            }
        } else {
            debug!(folder = %source_folder, "session moved on during save, skipping reload");
            ReloadStatus::Skipped
        };

        Ok(CommitReport {
            categorized_count: response.categorized_count,
            destination_folder: response.destination_folder,
            reload,
        })
    }

    fn fail(&self, context: NoticeContext, error: ClientError) -> ClientError {
        self.notifier.error(context, &error);
        error
    }
}

#[async_trait]
impl UploadCompletion for ReviewSession {
    async fn upload_completed(&self, destination: &str, _accepted: usize) {
        match self.load(destination).await {
            Ok(Loaded::Superseded) => {
                debug!(destination, "upload reload superseded by a newer load")
            }
            Ok(_) => {}
            // Already surfaced through the notifier.
            Err(err) => debug!(destination, %err, "upload reload failed"),
        }
    }
}

#[cfg(test)]
#[path = "tests/review_tests.rs"]
mod tests;
