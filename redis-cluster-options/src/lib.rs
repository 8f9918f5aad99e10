//! Configuration and error layer of a redis cluster cache client.
//! Used by redis-cluster-resource but usable on its own to validate and inspect configuration.

pub mod cluster_options;
pub mod error;
pub mod library_option;
pub mod node_info;
pub mod ssl_context;
pub mod topology;

pub use cluster_options::{ClusterOptions, ClusterOptionsBuilder};
pub use error::{LastErrorSource, LibraryError};

pub type Error = error::Error;
pub type Result<T> = error::Result<T>;
