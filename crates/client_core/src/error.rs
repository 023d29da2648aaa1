use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("error loading `{}`: {source}", display_path(.path))]
    Listing {
        path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("no images found in `{}`", display_path(.path))]
    EmptyFolder { path: String },
    #[error("`{label}` is not one of the review categories")]
    InvalidCategory { label: String },
    #[error("no image is loaded to categorize")]
    NoCurrentItem,
    #[error("categorize `{display_name}` before moving to the next image")]
    CategorizationRequired { display_name: String },
    #[error("no images have been categorized yet")]
    NothingToSave,
    #[error("a save is already in progress")]
    CommitInFlight,
    #[error("error saving categorized images from `{}`: {source}", display_path(.source_folder))]
    Save {
        source_folder: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("please select at least one file to upload")]
    NoFilesSelected,
    #[error("an upload is already in progress")]
    UploadInFlight,
    #[error("error uploading files to `{}`: {source}", display_path(.destination))]
    Upload {
        destination: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("error fetching image `{key}`: {source}")]
    ImageFetch {
        key: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("please enter a folder name")]
    EmptyFolderName,
    #[error("error creating folder `{name}` in `{}`: {source}", display_path(.parent))]
    CreateFolder {
        parent: String,
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ClientError {
    /// Soft outcomes are ordinary control flow that the user should still
    /// hear about (an empty folder, the categorization gate).
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ClientError::EmptyFolder { .. } | ClientError::CategorizationRequired { .. }
        )
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "Root"
    } else {
        path
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
