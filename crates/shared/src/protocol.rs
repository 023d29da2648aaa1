use serde::{Deserialize, Serialize};

use crate::domain::{join_key, Category, DirectoryNode, Item};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDirectoriesResponse {
    pub directories: Vec<DirectoryNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSubdirectoriesRequest {
    pub directory: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSubdirectoriesResponse {
    pub subdirectories: Vec<DirectoryNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesRequest {
    pub folder_path: String,
}

/// Image entry as listed by the server. Older deployments list bare file
/// names instead of `{filename, key}` objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ImageEntry {
    Keyed { filename: String, key: String },
    Named(String),
}

impl ImageEntry {
    pub fn into_item(self, folder_path: &str) -> Item {
        match self {
            ImageEntry::Keyed { filename, key } => Item {
                identifier: key,
                display_name: filename,
            },
            ImageEntry::Named(filename) => Item {
                identifier: join_key(folder_path, &filename),
                display_name: filename,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesResponse {
    #[serde(default)]
    pub folder_path: String,
    #[serde(default)]
    pub images: Vec<ImageEntry>,
}

impl ListImagesResponse {
    pub fn into_items(self) -> Vec<Item> {
        let folder_path = self.folder_path;
        self.images
            .into_iter()
            .map(|entry| entry.into_item(&folder_path))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategorizedImage {
    pub filename: String,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveCategorizedRequest {
    pub source_folder: String,
    pub categorized_images: Vec<CategorizedImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveCategorizedResponse {
    pub categorized_count: usize,
    #[serde(default)]
    pub destination_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub parent_folder: String,
    pub folder_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_images_accepts_keyed_and_bare_entries() {
        let raw = r#"{
            "folderPath": "photos/",
            "images": [{"filename": "a.jpg", "key": "photos/a.jpg"}, "b.jpg"]
        }"#;
        let response: ListImagesResponse = serde_json::from_str(raw).expect("decode");
        let items = response.into_items();

        assert_eq!(items[0].identifier, "photos/a.jpg");
        assert_eq!(items[1].display_name, "b.jpg");
        assert_eq!(items[1].identifier, "photos/b.jpg");
    }

    #[test]
    fn save_request_uses_server_field_names() {
        let request = SaveCategorizedRequest {
            source_folder: "photos/".into(),
            categorized_images: vec![CategorizedImage {
                filename: "a.jpg".into(),
                category: Category::Normal,
            }],
        };
        let value = serde_json::to_value(&request).expect("encode");
        assert_eq!(value["sourceFolder"], "photos/");
        assert_eq!(value["categorizedImages"][0]["filename"], "a.jpg");
        assert_eq!(value["categorizedImages"][0]["category"], "Normal");
    }
}
