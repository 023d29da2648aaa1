use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{join_key, normalize_directory, DirectoryNode, Item},
    protocol::SaveCategorizedResponse,
};
use tokio::sync::{broadcast, watch, Notify};

use crate::{
    backend::{
        CategorizedItem, DirectoryBackend, PendingFile, ReviewBackend, UploadBackend,
        UploadProgress,
    },
    notify::{Notification, Notifier},
};

/// Holds a collaborator call open until the test releases it.
#[derive(Default)]
pub(crate) struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub(crate) async fn entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// In-memory stand-in for the review API.
///
/// Saving moves the saved items out of their folder, the way the server
/// does, so a reload afterwards only sees what is left.
#[derive(Default)]
pub(crate) struct FakeBackend {
    root: Mutex<Vec<DirectoryNode>>,
    children: Mutex<HashMap<String, Vec<DirectoryNode>>>,
    items: Mutex<HashMap<String, Vec<Item>>>,
    failing_paths: Mutex<HashSet<String>>,
    fail_saves: Mutex<bool>,
    fail_uploads: Mutex<bool>,
    fail_creates: Mutex<bool>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    upload_script: Mutex<Vec<UploadProgress>>,
    progress_probe: Mutex<Option<watch::Receiver<u8>>>,
    observed_progress: Mutex<Vec<u8>>,
    listing_calls: Mutex<usize>,
    saves: Mutex<Vec<(String, Vec<CategorizedItem>)>>,
    uploads: Mutex<Vec<(String, Vec<String>)>>,
    created: Mutex<Vec<(String, String)>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_root(self, names: &[&str]) -> Self {
        *self.root.lock().unwrap() = names.iter().map(|name| node("", name)).collect();
        self
    }

    pub(crate) fn with_children(self, parent: &str, names: &[&str]) -> Self {
        let parent = normalize_directory(parent);
        let nodes = names.iter().map(|name| node(&parent, name)).collect();
        self.children.lock().unwrap().insert(parent, nodes);
        self
    }

    pub(crate) fn with_items(self, folder: &str, names: &[&str]) -> Self {
        let folder = normalize_directory(folder);
        let items = names.iter().map(|name| item(&folder, name)).collect();
        self.items.lock().unwrap().insert(folder, items);
        self
    }

    pub(crate) fn with_upload_script(self, steps: Vec<UploadProgress>) -> Self {
        *self.upload_script.lock().unwrap() = steps;
        self
    }

    pub(crate) fn fail_listing(&self, path: &str) {
        self.failing_paths
            .lock()
            .unwrap()
            .insert(normalize_directory(path));
    }

    pub(crate) fn fail_saves(&self, failing: bool) {
        *self.fail_saves.lock().unwrap() = failing;
    }

    pub(crate) fn fail_uploads(&self, failing: bool) {
        *self.fail_uploads.lock().unwrap() = failing;
    }

    pub(crate) fn fail_creates(&self, failing: bool) {
        *self.fail_creates.lock().unwrap() = failing;
    }

    /// Blocks the next call that touches `path` until released.
    pub(crate) fn gate(&self, path: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(normalize_directory(path), Arc::clone(&gate));
        gate
    }

    /// Samples `progress` after each scripted upload step.
    pub(crate) fn probe_progress(&self, progress: watch::Receiver<u8>) {
        *self.progress_probe.lock().unwrap() = Some(progress);
    }

    pub(crate) fn observed_progress(&self) -> Vec<u8> {
        self.observed_progress.lock().unwrap().clone()
    }

    pub(crate) fn listing_calls(&self) -> usize {
        *self.listing_calls.lock().unwrap()
    }

    pub(crate) fn saves(&self) -> Vec<(String, Vec<CategorizedItem>)> {
        self.saves.lock().unwrap().clone()
    }

    pub(crate) fn uploads(&self) -> Vec<(String, Vec<String>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub(crate) fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }

    async fn enter(&self, path: &str) -> Result<()> {
        *self.listing_calls.lock().unwrap() += 1;
        let gate = self.gates.lock().unwrap().remove(path);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if self.failing_paths.lock().unwrap().contains(path) {
            return Err(anyhow!("listing {path} failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl DirectoryBackend for FakeBackend {
    async fn list_root(&self) -> Result<Vec<DirectoryNode>> {
        self.enter("").await?;
        Ok(self.root.lock().unwrap().clone())
    }

    async fn list_children(&self, path: &str) -> Result<Vec<DirectoryNode>> {
        self.enter(path).await?;
        Ok(self
            .children
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<()> {
        if *self.fail_creates.lock().unwrap() {
            return Err(anyhow!("folder already exists"));
        }
        self.created
            .lock()
            .unwrap()
            .push((parent.to_string(), name.to_string()));
        let created = node(parent, name);
        if parent.is_empty() {
            self.root.lock().unwrap().push(created);
        } else {
            self.children
                .lock()
                .unwrap()
                .entry(parent.to_string())
                .or_default()
                .push(created);
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewBackend for FakeBackend {
    async fn list_items(&self, path: &str) -> Result<Vec<Item>> {
        self.enter(path).await?;
        Ok(self
            .items
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_categorized(
        &self,
        source_folder: &str,
        items: &[CategorizedItem],
    ) -> Result<SaveCategorizedResponse> {
        let gate = self.gates.lock().unwrap().remove(source_folder);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        if *self.fail_saves.lock().unwrap() {
            return Err(anyhow!("storage unavailable"));
        }
        self.saves
            .lock()
            .unwrap()
            .push((source_folder.to_string(), items.to_vec()));
        if let Some(remaining) = self.items.lock().unwrap().get_mut(source_folder) {
            remaining.retain(|candidate| !items.iter().any(|saved| saved.item == *candidate));
        }
        Ok(SaveCategorizedResponse {
            categorized_count: items.len(),
            destination_folder: format!("{source_folder}categorized/"),
        })
    }

    async fn fetch_image_bytes(&self, key: &str) -> Result<Vec<u8>> {
        Ok(key.as_bytes().to_vec())
    }
}

#[async_trait]
impl UploadBackend for FakeBackend {
    async fn upload_files(
        &self,
        destination: &str,
        files: &[PendingFile],
        progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> Result<usize> {
        let gate = self.gates.lock().unwrap().remove(destination);
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let script = self.upload_script.lock().unwrap().clone();
        for step in script {
            progress(step);
            let sampled = self
                .progress_probe
                .lock()
                .unwrap()
                .as_ref()
                .map(|probe| *probe.borrow());
            if let Some(sampled) = sampled {
                self.observed_progress.lock().unwrap().push(sampled);
            }
        }
        if *self.fail_uploads.lock().unwrap() {
            return Err(anyhow!("connection reset"));
        }
        self.uploads.lock().unwrap().push((
            destination.to_string(),
            files.iter().map(|file| file.filename.clone()).collect(),
        ));
        Ok(files.len())
    }
}

pub(crate) fn node(parent: &str, name: &str) -> DirectoryNode {
    DirectoryNode {
        name: name.to_string(),
        path: format!("{parent}{name}/"),
    }
}

pub(crate) fn item(folder: &str, name: &str) -> Item {
    Item {
        identifier: join_key(folder, name),
        display_name: name.to_string(),
    }
}

pub(crate) fn notifier() -> (Notifier, broadcast::Receiver<Notification>) {
    let notifier = Notifier::new();
    let rx = notifier.subscribe();
    (notifier, rx)
}

pub(crate) fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}
