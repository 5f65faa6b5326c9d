//! Small building blocks shared by peer and orderer configurations.

use serde::{Deserialize, Serialize};

use crate::merge_struct;

/// A `{ file: <path> }` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub file: String,
}
merge_struct!(File { file });

impl File {
    pub fn new(path: impl Into<String>) -> Self {
        Self { file: path.into() }
    }
}

/// A `{ files: [<path>, ...] }` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Files {
    pub files: Vec<String>,
}
merge_struct!(Files { files });
