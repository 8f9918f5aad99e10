//! Connection resource management for a redis cluster cache client.
//!
//! [`ClusterResourceManager`] lazily connects to a cluster addressed by
//! [`ClusterOptions`](redis_cluster_options::ClusterOptions), either through explicit seeds or a
//! named cluster resolved from a [`TopologySource`](redis_cluster_options::topology::TopologySource).
//! The underlying client library is plugged in by implementing [`ClusterConnector`] and
//! [`ClusterResource`].
//!
//! Once connected, declared library options are applied to the resource and every other option
//! known to the library is read back, so [`ClusterResourceManager::get_lib_option`] can answer for
//! options never set explicitly. Failures of the client library are translated into the
//! [`Error`] taxonomy, preferring the last error reported by the connection.

pub mod connector;
pub mod future;
pub mod plugin;
pub mod resource;
pub mod resource_manager;

pub use redis_cluster_options::cluster_options;
pub use redis_cluster_options::error;
pub use redis_cluster_options::library_option;
pub use redis_cluster_options::node_info;
pub use redis_cluster_options::ssl_context;
pub use redis_cluster_options::topology;

pub use connector::{ClusterConnector, ConnectRequest};
pub use plugin::{CachePlugin, PluginHost};
pub use resource::{ClusterResource, InfoTarget};
pub use resource_manager::{ClusterResourceManager, ResourceState};

pub type Error = error::Error;
pub type Result<T> = error::Result<T>;
