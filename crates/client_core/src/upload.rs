use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::domain::normalize_directory;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::{
    backend::{PendingFile, UploadBackend, UploadProgress},
    error::{ClientError, ClientResult},
    notify::{NoticeContext, Notifier},
    InFlightGuard,
};

#[async_trait]
pub trait UploadCompletion: Send + Sync {
    async fn upload_completed(&self, destination: &str, accepted: usize);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub destination: String,
    pub submitted: usize,
    pub accepted: usize,
}

pub struct UploadCoordinator {
    backend: Arc<dyn UploadBackend>,
    notifier: Notifier,
    completion: Option<Arc<dyn UploadCompletion>>,
    pending: Mutex<Vec<PendingFile>>,
    in_flight: AtomicBool,
    progress: watch::Sender<u8>,
}

impl UploadCoordinator {
    pub fn new(backend: Arc<dyn UploadBackend>, notifier: Notifier) -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            backend,
            notifier,
            completion: None,
            pending: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            progress,
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn UploadCompletion>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub async fn select_files(&self, files: Vec<PendingFile>) {
        *self.pending.lock().await = files;
    }

    pub async fn pending_files(&self) -> Vec<String> {
        self.pending
            .lock()
            .await
            .iter()
            .map(|file| file.filename.clone())
            .collect()
    }

    pub fn progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Uploads the pending files into `destination`.
    ///
    /// Progress only ever moves forward while the transfer runs. On failure
    /// the pending files are kept so the same call can be retried.
    pub async fn submit(&self, destination: &str) -> ClientResult<UploadReceipt> {
        let Some(in_flight) = InFlightGuard::try_acquire(&self.in_flight) else {
            warn!("submit called while an upload is already running");
            return Err(self.fail(ClientError::UploadInFlight));
        };

        let files = self.pending.lock().await.clone();
        if files.is_empty() {
            return Err(self.fail(ClientError::NoFilesSelected));
        }

        let destination = normalize_directory(destination);
        let total_bytes: u64 = files.iter().map(PendingFile::size).sum();
        info!(destination = %destination, files = files.len(), total_bytes, "starting upload");

        self.progress.send_replace(0);
        let progress = &self.progress;
        let report = move |update: UploadProgress| {
            let percent = update.percent();
            progress.send_if_modified(|current| {
                if percent > *current {
                    *current = percent;
                    true
                } else {
                    false
                }
            });
        };

        let result = self
            .backend
            .upload_files(&destination, &files, &report)
            .await;

        let accepted = match result {
            Ok(accepted) => accepted,
            Err(source) => {
                self.progress.send_replace(0);
                return Err(self.fail(ClientError::Upload {
                    destination,
                    source,
                }));
            }
        };

        self.progress.send_replace(100);
        {
            let mut pending = self.pending.lock().await;
            if *pending == files {
                pending.clear();
            }
        }
        self.progress.send_replace(0);
        drop(in_flight);

        self.notifier.success(
            NoticeContext::Upload,
            format!("Successfully uploaded {accepted} files."),
        );
        if let Some(completion) = &self.completion {
            completion.upload_completed(&destination, accepted).await;
        }

        Ok(UploadReceipt {
            destination,
            submitted: files.len(),
            accepted,
        })
    }

    fn fail(&self, error: ClientError) -> ClientError {
        self.notifier.error(NoticeContext::Upload, &error);
        error
    }
}

#[cfg(test)]
#[path = "tests/upload_tests.rs"]
mod tests;
