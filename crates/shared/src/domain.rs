use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ROOT_CRUMB_NAME: &str = "Root";

/// Fixed set of labels an image can be sorted into.
///
/// The serialized form is the label the server files images under, so
/// `InitialStage` travels as `"Initial Stage"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Initial Stage")]
    InitialStage,
    #[serde(rename = "Option3")]
    Option3,
    #[serde(rename = "Skip")]
    Skip,
}

impl Category {
    /// Display order; digit keys map onto this positionally.
    pub const ALL: [Category; 4] = [
        Category::Normal,
        Category::InitialStage,
        Category::Option3,
        Category::Skip,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Normal => "Normal",
            Category::InitialStage => "Initial Stage",
            Category::Option3 => "Option3",
            Category::Skip => "Skip",
        }
    }

    pub fn from_position(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.label() == label)
            .ok_or_else(|| UnknownCategory(label.to_string()))
    }
}

/// A single reviewable image.
///
/// `display_name` is what categorizations are keyed by; `identifier` is the
/// opaque storage key used to fetch the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    pub identifier: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

impl Breadcrumb {
    pub fn root() -> Self {
        Self {
            name: ROOT_CRUMB_NAME.to_string(),
            path: String::new(),
        }
    }
}

/// Canonical form of a directory path: no leading slash, no empty segments,
/// trailing slash for anything but the root (which is `""`).
pub fn normalize_directory(path: &str) -> String {
    let segments: Vec<&str> = path
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return String::new();
    }
    format!("{}/", segments.join("/"))
}

/// Root crumb followed by one crumb per non-empty segment of `current`.
pub fn breadcrumbs_for(current: &str) -> Vec<Breadcrumb> {
    let segments: Vec<&str> = current.split('/').filter(|s| !s.is_empty()).collect();
    let mut crumbs = Vec::with_capacity(segments.len() + 1);
    crumbs.push(Breadcrumb::root());
    for (index, segment) in segments.iter().enumerate() {
        crumbs.push(Breadcrumb {
            name: (*segment).to_string(),
            path: format!("{}/", segments[..=index].join("/")),
        });
    }
    crumbs
}

pub fn join_key(folder: &str, filename: &str) -> String {
    format!("{}{filename}", normalize_directory(folder))
}

/// Splits a storage key into its folder (trailing slash kept) and file name.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind('/') {
        Some(index) => (&key[..=index], &key[index + 1..]),
        None => ("", key),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn root_has_single_crumb() {
        assert_eq!(breadcrumbs_for(""), vec![Breadcrumb::root()]);
    }

    #[test]
    fn nested_path_reconstructs_prefixes() {
        let crumbs = breadcrumbs_for("photos/2023/");
        let paths: Vec<&str> = crumbs.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["", "photos/", "photos/2023/"]);
        assert_eq!(crumbs[2].name, "2023");
    }

    #[test]
    fn normalizes_slashes() {
        assert_eq!(normalize_directory("photos"), "photos/");
        assert_eq!(normalize_directory("/photos//2023"), "photos/2023/");
        assert_eq!(normalize_directory(" / "), "");
    }

    #[test]
    fn category_labels_round_trip_through_from_str() {
        for category in Category::ALL {
            assert_eq!(category.label().parse::<Category>(), Ok(category));
        }
        assert!("".parse::<Category>().is_err());
        assert!("normal".parse::<Category>().is_err());
    }

    #[test]
    fn category_serializes_as_label() {
        let json = serde_json::to_string(&Category::InitialStage).expect("serialize");
        assert_eq!(json, "\"Initial Stage\"");
    }

    #[test]
    fn split_key_keeps_folder_trailing_slash() {
        assert_eq!(split_key("photos/2023/a.jpg"), ("photos/2023/", "a.jpg"));
        assert_eq!(split_key("a.jpg"), ("", "a.jpg"));
        assert_eq!(join_key("photos", "a.jpg"), "photos/a.jpg");
    }

    proptest! {
        #[test]
        fn breadcrumbs_are_prefixes_of_current(segments in prop::collection::vec("[a-z0-9 ]{1,8}", 0..6)) {
            let current = normalize_directory(&segments.join("/"));
            let crumbs = breadcrumbs_for(&current);
            let expected_len = current.split('/').filter(|s| !s.is_empty()).count() + 1;

            prop_assert_eq!(crumbs.len(), expected_len);
            prop_assert_eq!(&crumbs[0], &Breadcrumb::root());
            for crumb in &crumbs {
                prop_assert!(current.starts_with(&crumb.path));
            }
            prop_assert_eq!(&crumbs.last().expect("root crumb").path, &current);
        }
    }
}
