//! Data types for the etcd v2 keyspace API

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error codes reported by the v2 keyspace API
pub mod error_code {
    /// The key does not exist
    pub const KEY_NOT_FOUND: u32 = 100;
    /// A compare-and-swap precondition did not hold
    pub const TEST_FAILED: u32 = 101;
    /// The target is a directory, not a file
    pub const NOT_FILE: u32 = 102;
    /// The target is a file, not a directory
    pub const NOT_DIR: u32 = 104;
    /// The key already exists
    pub const NODE_EXIST: u32 = 105;
    /// The root directory cannot be modified
    pub const ROOT_READ_ONLY: u32 = 107;
    /// The directory is not empty
    pub const DIR_NOT_EMPTY: u32 = 108;
    /// Internal consensus error
    pub const RAFT_INTERNAL: u32 = 300;
    /// The watcher was cleared by a recovery
    pub const WATCHER_CLEARED: u32 = 400;
    /// The requested watch index has been compacted away
    pub const EVENT_INDEX_CLEARED: u32 = 401;
}

/// A node in the keyspace tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Absolute key of this node
    #[serde(default)]
    pub key: String,
    /// Value of a file node; absent for directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// True when this node is a directory
    #[serde(default)]
    pub dir: bool,
    /// Children of a directory, in the order etcd returned them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    /// Index at which this node was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_index: Option<u64>,
    /// Index of the last modification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_index: Option<u64>,
    /// Remaining time to live in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    /// Expiration timestamp (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

/// The parsed outcome of a keyspace operation
///
/// Either `error_code` is set (with `message` and usually `cause`) or `node`
/// describes the affected key. The index fields are copied from the
/// `X-Etcd-Index`, `X-Raft-Index` and `X-Raft-Term` response headers; `None`
/// means the header was absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResult {
    /// Action etcd performed (`get`, `set`, `delete`, `compareAndSwap`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// The affected node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Node>,
    /// The node before the change, for mutating actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_node: Option<Node>,

    /// Error code, present only on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u32>,
    /// Error message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error cause, usually the offending key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// Index reported alongside an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,

    /// Value of the `X-Etcd-Index` header
    #[serde(skip)]
    pub etcd_index: Option<u64>,
    /// Value of the `X-Raft-Index` header
    #[serde(skip)]
    pub raft_index: Option<u64>,
    /// Value of the `X-Raft-Term` header
    #[serde(skip)]
    pub raft_term: Option<u64>,
}

impl KeysResult {
    /// Returns true if etcd reported an error code
    pub fn is_error(&self) -> bool {
        self.error_code.is_some()
    }

    /// Value of the result's node, if it is a file node
    pub fn value(&self) -> Option<&str> {
        self.node.as_ref().and_then(|n| n.value.as_deref())
    }
}

impl fmt::Display for KeysResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(e) => write!(f, "Error formatting: {}", e),
        }
    }
}

/// Options for [`Client::watch`](crate::Client::watch)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Wait for the first change at or after this index
    pub wait_index: Option<u64>,
    /// Watch the whole subtree below the key
    pub recursive: bool,
}

impl WatchOptions {
    /// Watch the subtree below the key
    pub fn recursive() -> Self {
        Self {
            recursive: true,
            ..Default::default()
        }
    }

    /// Start waiting from the given index
    pub fn starting_at(mut self, index: u64) -> Self {
        self.wait_index = Some(index);
        self
    }
}
