//! Tender record model and codec
//!
//! A tender record is a gist-like resource: an opaque id, a description, a
//! visibility flag and a set of named files. piphos keeps its whole payload
//! in one well-known file whose content is a flat JSON object mapping
//! hostnames to IP strings:
//!
//! ```json
//! {
//!   "id": "aa5a315d61ae9438b18d",
//!   "description": "_piphos_",
//!   "public": false,
//!   "files": {
//!     "_piphos_": {
//!       "filename": "_piphos_",
//!       "content": "{\"laptop\":\"203.0.113.1\"}",
//!       "truncated": false
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::{Error, Result};

/// Description and filename stamped on piphos records
pub const SENTINEL: &str = "_piphos_";

/// Hostname to IP address mapping stored in a record
///
/// Ordered so that the encoded content is stable between runs.
pub type HostIpMap = BTreeMap<String, String>;

/// Opaque record identifier assigned by the tender
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build from an optional cached hint, treating blank hints as absent
    pub fn from_hint(hint: Option<&str>) -> Option<Self> {
        hint.map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where piphos looks for its data inside a tender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    /// Description identifying piphos's record among the account's records
    pub sentinel: String,
    /// Name of the file holding the encoded [`HostIpMap`]
    pub filename: String,
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self {
            sentinel: SENTINEL.to_string(),
            filename: SENTINEL.to_string(),
        }
    }
}

/// A record as returned by the tender (list or fetch)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderRecord {
    pub id: RecordId,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub files: BTreeMap<String, FileContent>,
}

/// One named file inside a record
///
/// Listings omit `content`; fetches include it unless the file is too large,
/// in which case `truncated` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub truncated: bool,
}

impl TenderRecord {
    /// True if this record carries the given sentinel description
    pub fn is_marked(&self, sentinel: &str) -> bool {
        self.description.as_deref() == Some(sentinel)
    }

    /// Decode the host map held in the layout's well-known file
    pub fn hosts(&self, layout: &RecordLayout) -> Result<HostIpMap> {
        let file = self.files.get(&layout.filename).ok_or_else(|| {
            Error::malformed(format!(
                "record {} has no file named {:?}",
                self.id, layout.filename
            ))
        })?;

        if file.truncated {
            return Err(Error::malformed(format!(
                "file {:?} in record {} is truncated",
                layout.filename, self.id
            )));
        }

        let content = file.content.as_deref().ok_or_else(|| {
            Error::malformed(format!(
                "file {:?} in record {} has no content",
                layout.filename, self.id
            ))
        })?;

        decode_hosts(content)
    }
}

/// Body of a create or update request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordDraft {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public: Option<bool>,
    pub files: BTreeMap<String, FileDraft>,
}

/// File body inside a [`RecordDraft`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDraft {
    pub content: String,
}

impl RecordDraft {
    /// Draft for a brand new, private record holding `hosts`
    pub fn create(layout: &RecordLayout, hosts: &HostIpMap) -> Result<Self> {
        let mut draft = Self::update(layout, hosts)?;
        draft.public = Some(false);
        Ok(draft)
    }

    /// Draft replacing the well-known file of an existing record
    ///
    /// Visibility cannot be changed after creation, so it is left out.
    pub fn update(layout: &RecordLayout, hosts: &HostIpMap) -> Result<Self> {
        let mut files = BTreeMap::new();
        files.insert(
            layout.filename.clone(),
            FileDraft {
                content: encode_hosts(hosts)?,
            },
        );
        Ok(Self {
            description: layout.sentinel.clone(),
            public: None,
            files,
        })
    }

    /// Decode the host map this draft would store
    pub fn hosts(&self, layout: &RecordLayout) -> Result<HostIpMap> {
        let file = self
            .files
            .get(&layout.filename)
            .ok_or_else(|| Error::malformed(format!("draft has no file {:?}", layout.filename)))?;
        decode_hosts(&file.content)
    }
}

/// Encode a host map as file content
pub fn encode_hosts(hosts: &HostIpMap) -> Result<String> {
    Ok(serde_json::to_string(hosts)?)
}

/// Decode file content into a host map
pub fn decode_hosts(content: &str) -> Result<HostIpMap> {
    serde_json::from_str(content)
        .map_err(|e| Error::malformed(format!("cannot decode host map: {}", e)))
}
