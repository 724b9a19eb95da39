use serde::Deserialize;
use serde::Serialize;

/// Node metadata stamped by the store on every mutation
///
/// Zxids are store-wide transaction ids; times are milliseconds since the
/// Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stat {
    /// Zxid of the transaction that created the node
    pub czxid: u64,
    /// Zxid of the last data modification
    pub mzxid: u64,
    /// Zxid of the last change to the node's children
    pub pzxid: u64,
    pub ctime: u64,
    pub mtime: u64,
    /// Number of data modifications
    pub version: i32,
    /// Number of child modifications
    pub cversion: i32,
    pub data_length: u32,
    pub num_children: u32,
}

impl Stat {
    /// Latest zxid that touched this node
    pub fn last_zxid(&self) -> u64 {
        self.mzxid.max(self.pzxid)
    }
}
