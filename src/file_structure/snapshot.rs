use std::collections::{BTreeMap, HashMap};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

use super::{DirEntry, Entry, FileEntry};

/// Persisted, flag-free form of a tree.
///
/// A directory is written as `{"dir": {<name>: <node>, ...}}` and a file as
/// its bare modification time. The root is a directory node without a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Snapshot {
    File(f64),
    Dir { dir: BTreeMap<String, Snapshot> },
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string(self).context(EncodeSnafu)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(json).context(DecodeSnafu)
    }
}

impl From<&Entry> for Snapshot {
    fn from(entry: &Entry) -> Self {
        match entry {
            Entry::File(file) => Snapshot::File(file.modified.into_inner()),
            Entry::Dir(dir) => dir.into(),
        }
    }
}

impl From<&DirEntry> for Snapshot {
    fn from(dir: &DirEntry) -> Self {
        Snapshot::Dir {
            dir: dir
                .children
                .iter()
                .map(|(name, entry)| (name.clone(), entry.into()))
                .collect(),
        }
    }
}

impl From<&Snapshot> for Entry {
    fn from(snapshot: &Snapshot) -> Self {
        match snapshot {
            Snapshot::File(modified) => Entry::File(FileEntry::new(OrderedFloat(*modified))),
            Snapshot::Dir { dir } => Entry::Dir(DirEntry {
                children: dir
                    .iter()
                    .map(|(name, child)| (name.clone(), child.into()))
                    .collect::<HashMap<_, _>>(),
                ..DirEntry::default()
            }),
        }
    }
}

impl TryFrom<&Snapshot> for DirEntry {
    type Error = SnapshotError;

    fn try_from(snapshot: &Snapshot) -> Result<Self, Self::Error> {
        match Entry::from(snapshot) {
            Entry::Dir(dir) => Ok(dir),
            Entry::File(_) => Err(SnapshotError::RootNotDirectory),
        }
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotError {
    #[snafu(display("Failed to encode the snapshot"))]
    EncodeError { source: serde_json::Error },
    #[snafu(display("Failed to decode the snapshot"))]
    DecodeError { source: serde_json::Error },
    #[snafu(display("The snapshot root must be a directory"))]
    RootNotDirectory,
}
