use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::{Category, DirectoryNode, Item},
    protocol::SaveCategorizedResponse,
};

#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    async fn list_root(&self) -> Result<Vec<DirectoryNode>>;
    async fn list_children(&self, path: &str) -> Result<Vec<DirectoryNode>>;
    async fn create_folder(&self, parent: &str, name: &str) -> Result<()>;
}

#[async_trait]
pub trait ReviewBackend: Send + Sync {
    /// Items of `path` in server order. An empty folder is a valid answer.
    async fn list_items(&self, path: &str) -> Result<Vec<Item>>;
    async fn save_categorized(
        &self,
        source_folder: &str,
        items: &[CategorizedItem],
    ) -> Result<SaveCategorizedResponse>;
    async fn fetch_image_bytes(&self, key: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn upload_files(
        &self,
        destination: &str,
        files: &[PendingFile],
        progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedItem {
    pub item: Item,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub contents: Vec<u8>,
}

impl PendingFile {
    pub fn new(filename: impl Into<String>, contents: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            mime_type,
            contents,
        }
    }

    pub fn size(&self) -> u64 {
        self.contents.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Rounded percentage in `[0, 100]`. An empty body counts as done.
    pub fn percent(self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let sent = self.sent.min(self.total);
        ((sent * 100 + self.total / 2) / self.total) as u8
    }
}
