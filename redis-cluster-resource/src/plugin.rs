use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use redis_cluster_options::library_option::{LibraryOptionValue, LibraryOptions, Serializer};

/// A plugin registered on the cache adapter.
pub trait CachePlugin {
    /// Reports if the plugin serializes values before they reach the cluster.
    fn serializes_values(&self) -> bool;
}

/// The cache adapter side, owning a registry of plugins.
#[cfg_attr(test, automock)]
pub trait PluginHost {
    fn plugins(&self) -> Vec<Arc<dyn CachePlugin + Send + Sync>>;
}

/// Values are serialized either by the client library, when a serializer other than
/// [`Serializer::None`] is declared, or by a serializing plugin of the adapter.
pub fn has_serialization_support(lib_options: &LibraryOptions, host: &dyn PluginHost) -> bool {
    let declared = lib_options
        .serializer()
        .cloned()
        .unwrap_or_else(|| Serializer::None.into());

    if declared != LibraryOptionValue::from(Serializer::None) {
        return true;
    }

    host.plugins()
        .iter()
        .any(|plugin| plugin.serializes_values())
}
