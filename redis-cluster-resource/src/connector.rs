use derivative::Derivative;
use derive_more::Constructor;
use std::time::Duration;

use crate::future::BoxFuture;
use crate::resource::ClusterResource;
use redis_cluster_options::ssl_context::SslContext;
use redis_cluster_options::{LastErrorSource, LibraryError};

/// Everything needed to open a cluster connection, already resolved from either explicit seeds or
/// a named topology.
#[derive(Derivative, Clone, PartialEq, Constructor)]
#[derivative(Debug)]
pub struct ConnectRequest {
    pub seeds: Vec<String>,
    /// Connect timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Read timeout applied to commands. `None` waits indefinitely.
    pub read_timeout: Option<Duration>,
    pub persistent: bool,
    /// Never empty when set.
    #[derivative(Debug = "ignore")]
    pub password: Option<String>,
    pub ssl_context: Option<SslContext>,
}

/// Opens connections to a cluster using the underlying client library. The connector's last
/// error describes its most recent failed attempt.
pub trait ClusterConnector: LastErrorSource + Send + Sync {
    type Resource: ClusterResource + 'static;

    /// Reports if the client library can be used in this process at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Tries to establish a new connection resource.
    fn connect(&self, request: ConnectRequest) -> BoxFuture<Result<Self::Resource, LibraryError>>;
}
