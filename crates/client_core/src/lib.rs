use std::sync::Arc;

use tokio::sync::broadcast;

pub mod backend;
pub mod error;
mod guard;
pub mod http;
pub mod keymap;
pub mod navigation;
pub mod notify;
pub mod review;
pub mod upload;

pub(crate) use guard::{BusyGuard, InFlightGuard};

pub use backend::{
    CategorizedItem, DirectoryBackend, PendingFile, ReviewBackend, UploadBackend, UploadProgress,
};
pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use keymap::{action_for_key, ReviewAction, ReviewKey};
pub use navigation::{Navigated, NavigationController, NavigationSnapshot};
pub use notify::{NoticeContext, NoticeLevel, Notification, Notifier};
pub use review::{
    ActionOutcome, CommitReport, Loaded, ReloadStatus, ReviewSession, SessionPhase,
    SessionSnapshot, Step, ZoomLevel,
};
pub use upload::{UploadCompletion, UploadCoordinator, UploadReceipt};

pub trait ReviewApi: DirectoryBackend + ReviewBackend + UploadBackend {}

impl<T> ReviewApi for T where T: DirectoryBackend + ReviewBackend + UploadBackend {}

/// Uploads reload the review session on their destination once they finish.
pub struct PicsortClient {
    pub navigation: NavigationController,
    pub review: Arc<ReviewSession>,
    pub upload: UploadCoordinator,
    notifier: Notifier,
}

impl PicsortClient {
    pub fn new<B: ReviewApi + 'static>(backend: Arc<B>) -> Self {
        let notifier = Notifier::new();
        let navigation = NavigationController::new(backend.clone(), notifier.clone());
        let review = Arc::new(ReviewSession::new(backend.clone(), notifier.clone()));
        let upload =
            UploadCoordinator::new(backend, notifier.clone()).with_completion(review.clone());
        Self {
            navigation,
            review,
            upload,
            notifier,
        }
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub async fn open_current_folder(&self) -> ClientResult<Loaded> {
        let path = self.navigation.current_directory().await;
        self.review.load(&path).await
    }

    pub async fn upload_to_current_folder(&self) -> ClientResult<UploadReceipt> {
        let path = self.navigation.current_directory().await;
        self.upload.submit(&path).await
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
