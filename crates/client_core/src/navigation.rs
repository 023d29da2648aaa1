use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use shared::domain::{breadcrumbs_for, normalize_directory, Breadcrumb, DirectoryNode};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    backend::DirectoryBackend,
    error::{ClientError, ClientResult},
    notify::{NoticeContext, Notifier},
    BusyGuard,
};

/// Result of a navigation call that did not fail.
///
/// `Superseded` means a newer navigation was issued while this one waited on
/// the collaborator, so its response was dropped without touching state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigated {
    Applied,
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSnapshot {
    pub current_directory: String,
    pub history: Vec<String>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub available_dirs: Vec<DirectoryNode>,
    pub subdirectories: Vec<DirectoryNode>,
    pub loading: bool,
}

impl NavigationSnapshot {
    pub fn is_at_root(&self) -> bool {
        self.current_directory.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn visible_directories(&self) -> &[DirectoryNode] {
        if self.is_at_root() {
            &self.available_dirs
        } else {
            &self.subdirectories
        }
    }
}

#[derive(Debug)]
struct NavigationState {
    current_directory: String,
    history: Vec<String>,
    breadcrumbs: Vec<Breadcrumb>,
    available_dirs: Vec<DirectoryNode>,
    subdirectories: Vec<DirectoryNode>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            current_directory: String::new(),
            history: Vec::new(),
            breadcrumbs: vec![Breadcrumb::root()],
            available_dirs: Vec::new(),
            subdirectories: Vec::new(),
        }
    }
}

impl NavigationState {
    fn reset_to_root(&mut self) {
        self.current_directory.clear();
        self.history.clear();
        self.subdirectories.clear();
        self.breadcrumbs = vec![Breadcrumb::root()];
    }

    fn enter(&mut self, path: String, subdirectories: Vec<DirectoryNode>, history: Vec<String>) {
        self.breadcrumbs = breadcrumbs_for(&path);
        self.current_directory = path;
        self.subdirectories = subdirectories;
        self.history = history;
    }
}

pub struct NavigationController {
    backend: Arc<dyn DirectoryBackend>,
    notifier: Notifier,
    inner: Mutex<NavigationState>,
    latest_request: AtomicU64,
    in_flight: AtomicUsize,
}

impl NavigationController {
    pub fn new(backend: Arc<dyn DirectoryBackend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            inner: Mutex::new(NavigationState::default()),
            latest_request: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn snapshot(&self) -> NavigationSnapshot {
        let guard = self.inner.lock().await;
        NavigationSnapshot {
            current_directory: guard.current_directory.clone(),
            history: guard.history.clone(),
            breadcrumbs: guard.breadcrumbs.clone(),
            available_dirs: guard.available_dirs.clone(),
            subdirectories: guard.subdirectories.clone(),
            loading: self.in_flight.load(Ordering::SeqCst) > 0,
        }
    }

    pub async fn current_directory(&self) -> String {
        self.inner.lock().await.current_directory.clone()
    }

    pub async fn open_root(&self) -> ClientResult<Navigated> {
        let ticket = self.issue_ticket();
        let _busy = BusyGuard::enter(&self.in_flight);
        let listing = self.backend.list_root().await;

        let mut state = self.inner.lock().await;
        if !self.is_latest(ticket) {
            debug!(ticket, "dropping superseded root listing");
            return Ok(Navigated::Superseded);
        }
        match listing {
            Ok(directories) => {
                state.available_dirs = directories;
                state.reset_to_root();
                Ok(Navigated::Applied)
            }
            Err(source) => {
                drop(state);
                Err(self.fail(ClientError::Listing {
                    path: String::new(),
                    source,
                }))
            }
        }
    }

    pub async fn descend(&self, path: &str) -> ClientResult<Navigated> {
        let path = normalize_directory(path);
        if path.is_empty() {
            return self.open_root().await;
        }

        let ticket = self.issue_ticket();
        let _busy = BusyGuard::enter(&self.in_flight);
        let listing = self.backend.list_children(&path).await;

        let mut state = self.inner.lock().await;
        if !self.is_latest(ticket) {
            debug!(ticket, path = %path, "dropping superseded listing");
            return Ok(Navigated::Superseded);
        }
        match listing {
            Ok(subdirectories) => {
                let mut history = state.history.clone();
                history.push(path.clone());
                info!(path = %path, depth = history.len(), "entered directory");
                state.enter(path, subdirectories, history);
                Ok(Navigated::Applied)
            }
            Err(source) => {
                drop(state);
                Err(self.fail(ClientError::Listing { path, source }))
            }
        }
    }

    pub async fn select_breadcrumb(&self, path: &str) -> ClientResult<Navigated> {
        self.descend(path).await
    }

    /// Steps one level back through the history, re-fetching the listing of
    /// the directory being returned to.
    pub async fn go_back(&self) -> ClientResult<Navigated> {
        let (ticket, target, history) = {
            let mut state = self.inner.lock().await;
            let ticket = self.issue_ticket();
            if state.history.len() <= 1 {
                state.reset_to_root();
                return Ok(Navigated::Applied);
            }
            let mut history = state.history.clone();
            history.pop();
            let target = history.last().cloned().unwrap_or_default();
            (ticket, target, history)
        };

        let _busy = BusyGuard::enter(&self.in_flight);
        let listing = self.backend.list_children(&target).await;

        let mut state = self.inner.lock().await;
        if !self.is_latest(ticket) {
            debug!(ticket, path = %target, "dropping superseded back navigation");
            return Ok(Navigated::Superseded);
        }
        match listing {
            Ok(subdirectories) => {
                state.enter(target, subdirectories, history);
                Ok(Navigated::Applied)
            }
            Err(source) => {
                drop(state);
                Err(self.fail(ClientError::Listing {
                    path: target,
                    source,
                }))
            }
        }
    }

    pub async fn refresh(&self) -> ClientResult<Navigated> {
        let (ticket, path) = {
            let state = self.inner.lock().await;
            (self.issue_ticket(), state.current_directory.clone())
        };

        let _busy = BusyGuard::enter(&self.in_flight);
        let listing = if path.is_empty() {
            self.backend.list_root().await
        } else {
            self.backend.list_children(&path).await
        };

        let mut state = self.inner.lock().await;
        if !self.is_latest(ticket) {
            return Ok(Navigated::Superseded);
        }
        match listing {
            Ok(directories) if path.is_empty() => {
                state.available_dirs = directories;
                Ok(Navigated::Applied)
            }
            Ok(directories) => {
                state.subdirectories = directories;
                Ok(Navigated::Applied)
            }
            Err(source) => {
                drop(state);
                Err(self.fail(ClientError::Listing { path, source }))
            }
        }
    }

    pub async fn create_folder(&self, name: &str) -> ClientResult<Navigated> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.fail_in(NoticeContext::CreateFolder, ClientError::EmptyFolderName));
        }

        let parent = self.current_directory().await;
        if let Err(source) = self.backend.create_folder(&parent, name).await {
            return Err(self.fail_in(
                NoticeContext::CreateFolder,
                ClientError::CreateFolder {
                    parent,
                    name: name.to_string(),
                    source,
                },
            ));
        }

        self.notifier.success(
            NoticeContext::CreateFolder,
            format!("Folder \"{name}\" created successfully."),
        );
        self.refresh().await
    }

    fn issue_ticket(&self) -> u64 {
        self.latest_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, ticket: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == ticket
    }

    fn fail(&self, error: ClientError) -> ClientError {
        self.fail_in(NoticeContext::Browse, error)
    }

    fn fail_in(&self, context: NoticeContext, error: ClientError) -> ClientError {
        self.notifier.error(context, &error);
        error
    }
}

#[cfg(test)]
#[path = "tests/navigation_tests.rs"]
mod tests;
