//! Result entry: the cached outputs of one successful compilation
//! (spec §3 "Result entry").
//!
//! An ordered list of `(file_type, payload_bytes)` with at most one entry
//! per [`FileType`]. Serialized with `postcard` the way the teacher
//! crate persists its own cache entries, then wrapped in a
//! [`crate::envelope::Envelope`] for on-disk storage.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    Object,
    Dependency,
    StderrOutput,
    CoverageUnmangled,
    StackUsage,
    Diagnostic,
    DwarfObject,
    AssemblerListing,
    IncludedPchFile,
    CovNoteData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub file_type: FileType,
    pub bytes: Vec<u8>,
}

/// An ordered, unique-by-`file_type` set of produced files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultEntry {
    files: Vec<ResultFile>,
}

impl ResultEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any existing entry of the same type
    /// ("at most one entry per `file_type`").
    pub fn insert(&mut self, file_type: FileType, bytes: Vec<u8>) {
        if let Some(existing) = self.files.iter_mut().find(|f| f.file_type == file_type) {
            existing.bytes = bytes;
        } else {
            self.files.push(ResultFile { file_type, bytes });
        }
    }

    pub fn get(&self, file_type: FileType) -> Option<&[u8]> {
        self.files
            .iter()
            .find(|f| f.file_type == file_type)
            .map(|f| f.bytes.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultFile> {
        self.files.iter()
    }

    /// Validate the mandatory-`object`-when-expected invariant (spec §3).
    pub fn validate(&self, expect_output_obj: bool) -> Result<()> {
        if expect_output_obj && self.get(FileType::Object).is_none() {
            return Err(Error::Internal(
                "result entry missing mandatory object file".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for f in &self.files {
            if !seen.insert(f.file_type) {
                return Err(Error::Internal(format!(
                    "result entry has duplicate file_type {:?}",
                    f.file_type
                )));
            }
        }
        Ok(())
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self)
            .map_err(|e| Error::Internal(format!("result entry serialize failed: {e}")))
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes)
            .map_err(|e| Error::Internal(format!("result entry deserialize failed: {e}")))
    }
}

#[cfg(test)]
#[path = "result_entry_tests.rs"]
mod tests;
