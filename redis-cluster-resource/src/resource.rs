use derive_more::Display;

use crate::future::BoxFuture;
use redis_cluster_options::library_option::LibraryOptionValue;
use redis_cluster_options::node_info::NodeInfo;
use redis_cluster_options::{LastErrorSource, LibraryError};

/// Node selection for an `INFO` query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum InfoTarget {
    /// The node owning the slot of given key.
    #[display("key {_0}")]
    Key(String),
    /// A node given by its `host:port` address.
    #[display("address {_0}")]
    Address(String),
}

/// A live cluster connection. Library options are local to the connection, the `INFO` query goes
/// over the network.
pub trait ClusterResource: LastErrorSource + Send + Sync {
    /// Sets a library option. `Ok(false)` means the library refused the value without raising an
    /// error.
    fn set_option(&self, option: i64, value: &LibraryOptionValue) -> Result<bool, LibraryError>;

    /// Current value of a library option.
    fn get_option(&self, option: i64) -> Result<LibraryOptionValue, LibraryError>;

    fn info(&self, target: &InfoTarget) -> BoxFuture<Result<NodeInfo, LibraryError>>;
}
