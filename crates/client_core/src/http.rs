use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{
    multipart::{Form, Part},
    Body, Client, Response,
};
use shared::{
    domain::{split_key, DirectoryNode, Item},
    error::ApiError,
    protocol::{
        CategorizedImage, CreateFolderRequest, ListDirectoriesResponse, ListImagesRequest,
        ListImagesResponse, ListSubdirectoriesRequest, ListSubdirectoriesResponse,
        SaveCategorizedRequest, SaveCategorizedResponse, UploadResponse,
    },
};
use tokio::sync::watch;
use tracing::debug;
use url::Url;

use crate::backend::{
    CategorizedItem, DirectoryBackend, PendingFile, ReviewBackend, UploadBackend, UploadProgress,
};

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API base url '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API base url '{base_url}' cannot carry a path"));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL a front-end can render the image from. Folder and file name each
    /// travel as a single percent-encoded segment.
    pub fn image_url(&self, folder: &str, filename: &str) -> Result<Url> {
        let folder = folder.trim_start_matches('/');
        self.endpoint(&["api", "image", folder, filename])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base url '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn expect_success(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = ApiError::from_body(&body)
        .map(|parsed| parsed.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(anyhow!("{endpoint} returned {status}: {message}"))
}

#[async_trait]
impl DirectoryBackend for HttpBackend {
    async fn list_root(&self) -> Result<Vec<DirectoryNode>> {
        let url = self.endpoint(&["api", "list-directories"])?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("failed to fetch directories")?;
        let body: ListDirectoriesResponse = expect_success(response, "list-directories")
            .await?
            .json()
            .await
            .context("malformed directory listing")?;
        debug!(count = body.directories.len(), "listed root directories");
        Ok(body.directories)
    }

    async fn list_children(&self, path: &str) -> Result<Vec<DirectoryNode>> {
        let url = self.endpoint(&["api", "list-subdirectories"])?;
        let response = self
            .http
            .post(url)
            .json(&ListSubdirectoriesRequest {
                directory: path.to_string(),
            })
            .send()
            .await
            .context("failed to fetch subdirectories")?;
        let body: ListSubdirectoriesResponse = expect_success(response, "list-subdirectories")
            .await?
            .json()
            .await
            .context("malformed subdirectory listing")?;
        debug!(path, count = body.subdirectories.len(), "listed subdirectories");
        Ok(body.subdirectories)
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<()> {
        let url = self.endpoint(&["api", "create-folder"])?;
        let response = self
            .http
            .post(url)
            .json(&CreateFolderRequest {
                parent_folder: parent.to_string(),
                folder_name: name.to_string(),
            })
            .send()
            .await
            .context("failed to create folder")?;
        expect_success(response, "create-folder").await?;
        Ok(())
    }
}

#[async_trait]
impl ReviewBackend for HttpBackend {
    async fn list_items(&self, path: &str) -> Result<Vec<Item>> {
        let url = self.endpoint(&["api", "list-images"])?;
        let response = self
            .http
            .post(url)
            .json(&ListImagesRequest {
                folder_path: path.to_string(),
            })
            .send()
            .await
            .context("failed to fetch images")?;
        let mut body: ListImagesResponse = expect_success(response, "list-images")
            .await?
            .json()
            .await
            .context("malformed image listing")?;
        if body.folder_path.is_empty() {
            body.folder_path = path.to_string();
        }
        Ok(body.into_items())
    }

    async fn save_categorized(
        &self,
        source_folder: &str,
        items: &[CategorizedItem],
    ) -> Result<SaveCategorizedResponse> {
        let url = self.endpoint(&["api", "save-categorized"])?;
        let request = SaveCategorizedRequest {
            source_folder: source_folder.to_string(),
            categorized_images: items
                .iter()
                .map(|entry| CategorizedImage {
                    filename: entry.item.display_name.clone(),
                    category: entry.category,
                })
                .collect(),
        };
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .context("failed to save categorized images")?;
        expect_success(response, "save-categorized")
            .await?
            .json()
            .await
            .context("malformed save response")
    }

    async fn fetch_image_bytes(&self, key: &str) -> Result<Vec<u8>> {
        let (folder, filename) = split_key(key);
        let url = self.image_url(folder, filename)?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to fetch image {key}"))?;
        let bytes = expect_success(response, "image").await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl UploadBackend for HttpBackend {
    async fn upload_files(
        &self,
        destination: &str,
        files: &[PendingFile],
        progress: &(dyn Fn(UploadProgress) + Send + Sync),
    ) -> Result<usize> {
        let url = self.endpoint(&["api", "upload-images"])?;
        let total: u64 = files.iter().map(PendingFile::size).sum();

        let (sent_tx, mut sent_rx) = watch::channel(0u64);
        let sent_tx = Arc::new(sent_tx);
        let mut form = Form::new();
        for file in files {
            let chunks: Vec<Vec<u8>> = file
                .contents
                .chunks(UPLOAD_CHUNK_SIZE)
                .map(<[u8]>::to_vec)
                .collect();
            let counter = Arc::clone(&sent_tx);
            let stream = futures::stream::iter(chunks).map(move |chunk| {
                counter.send_modify(|sent| *sent += chunk.len() as u64);
                Ok::<_, std::io::Error>(chunk)
            });
            let mut part = Part::stream_with_length(Body::wrap_stream(stream), file.size())
                .file_name(file.filename.clone());
            if let Some(mime_type) = &file.mime_type {
                part = part
                    .mime_str(mime_type)
                    .with_context(|| format!("invalid mime type '{mime_type}'"))?;
            }
            form = form.part("files[]", part);
        }
        form = form.text("destination", destination.to_string());
        drop(sent_tx);

        let request = self.http.post(url).multipart(form).send();
        tokio::pin!(request);
        let mut counting = true;
        let response = loop {
            tokio::select! {
                response = &mut request => break response.context("failed to upload files")?,
                changed = sent_rx.changed(), if counting => match changed {
                    Ok(()) => {
                        let sent = *sent_rx.borrow_and_update();
                        progress(UploadProgress { sent, total });
                    }
                    Err(_) => counting = false,
                },
            }
        };
        let body: UploadResponse = expect_success(response, "upload-images")
            .await?
            .json()
            .await
            .context("malformed upload response")?;
        progress(UploadProgress { sent: total, total });
        debug!(destination, accepted = body.success_count, "upload finished");
        Ok(body.success_count)
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
