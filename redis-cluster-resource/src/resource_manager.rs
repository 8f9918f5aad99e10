use derive_more::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::*;

use crate::connector::{ClusterConnector, ConnectRequest};
use crate::plugin::{self, PluginHost};
use crate::resource::{ClusterResource, InfoTarget};
use redis_cluster_options::cluster_options::seconds_to_duration;
use redis_cluster_options::error::{Error, Result};
use redis_cluster_options::library_option::{LibraryOptionValue, LibraryOptions, LIBRARY_OPTIONS};
use redis_cluster_options::topology::{ClusterTopology, EnvTopologySource, TopologySource};
use redis_cluster_options::{ClusterOptions, LastErrorSource, LibraryError};

const EXTENSION_MISSING_MESSAGE: &str = "Redis extension is not loaded";

/// Lifecycle state of the managed connection resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResourceState {
    /// No connection attempt was made yet, or the resource was disconnected.
    Unconnected,
    Connected,
    /// The last connection attempt failed. The next access tries again. Failures after a
    /// successful connect keep the resource connected.
    Faulted,
}

enum Connection<R> {
    Unconnected,
    Connected(Arc<R>),
    Faulted,
}

impl<R> Connection<R> {
    fn state(&self) -> ResourceState {
        match self {
            Connection::Unconnected => ResourceState::Unconnected,
            Connection::Connected(_) => ResourceState::Connected,
            Connection::Faulted => ResourceState::Faulted,
        }
    }
}

struct ManagerState<R> {
    options: ClusterOptions,
    connection: Connection<R>,
    // declared options together with the ones read back from the live resource
    library_options: LibraryOptions,
}

/// Lazily connects to a redis cluster and keeps the connection for further use. One manager
/// exists per distinct [`ClusterOptions`].
///
/// Creating the resource, reading back library options and memoizing the server version all
/// happen under a single lock, so concurrent first access results in a single connection.
pub struct ClusterResourceManager<C: ClusterConnector> {
    connector: C,
    topology_source: Arc<dyn TopologySource + Send + Sync>,
    state: Mutex<ManagerState<C::Resource>>,
}

impl<C: ClusterConnector> ClusterResourceManager<C> {
    /// Creates a manager resolving named clusters from the process environment.
    pub fn new(options: ClusterOptions, connector: C) -> Result<Self> {
        Self::with_topology_source(options, connector, Arc::new(EnvTopologySource))
    }

    pub fn with_topology_source(
        options: ClusterOptions,
        connector: C,
        topology_source: Arc<dyn TopologySource + Send + Sync>,
    ) -> Result<Self> {
        if !connector.is_available() {
            error!("Redis cluster connector is not available.");
            return Err(Error::ExtensionMissing(EXTENSION_MISSING_MESSAGE.into()));
        }

        Ok(ClusterResourceManager {
            connector,
            topology_source,
            state: Mutex::new(ManagerState {
                options,
                connection: Connection::Unconnected,
                library_options: LibraryOptions::new(),
            }),
        })
    }

    /// Returns the connected resource, connecting first if needed. Declared library options are
    /// applied to a fresh connection in declaration order.
    pub async fn get_resource(&self) -> Result<Arc<C::Resource>> {
        let mut state = self.state.lock().await;
        self.connected_resource(&mut state).await
    }

    /// Value of a library option, preferring the merged options gathered when connecting.
    pub async fn get_lib_option<O: Into<i64>>(&self, option: O) -> Result<LibraryOptionValue> {
        let option = option.into();
        let mut state = self.state.lock().await;

        if let Some(value) = state.library_options.get(option) {
            return Ok(value.clone());
        }

        let resource = self.connected_resource(&mut state).await?;
        if let Some(value) = state.library_options.get(option) {
            return Ok(value.clone());
        }

        resource
            .get_option(option)
            .map_err(|error| Error::from_protocol_failure(error, &*resource))
    }

    /// Server version, either declared in the options or queried from the cluster once and
    /// memoized.
    pub async fn get_version(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let Some(version) = state.options.redis_version() {
            if !version.is_empty() {
                return Ok(version.to_string());
            }
        }

        let resource = self.connected_resource(&mut state).await?;
        let target = info_target(&state.options)?;

        let info = resource
            .info(&target)
            .await
            .map_err(|error| Error::from_protocol_failure(error, &*resource))?;

        let version = info
            .version()
            .ok_or_else(|| {
                Error::from_protocol_failure(
                    LibraryError::new(format!("No server version reported by {target}."), 0),
                    &*resource,
                )
            })?
            .to_string();

        state
            .options
            .set_redis_version(version.clone())
            .map_err(|error| Error::RuntimeProtocol {
                message: error.to_string(),
                code: 0,
                source: None,
            })?;

        debug!(%version, %target, "Discovered redis version.");
        Ok(version)
    }

    /// Reports if values stored through the adapter get serialized, either by the client library
    /// or by a plugin registered on the adapter.
    pub async fn has_serialization_support(&self, host: &dyn PluginHost) -> bool {
        let state = self.state.lock().await;
        plugin::has_serialization_support(state.options.lib_options(), host)
    }

    /// Snapshot of the current options.
    pub async fn options(&self) -> ClusterOptions {
        self.state.lock().await.options.clone()
    }

    /// Mutates the options. Changes apply to the next connection, not to an already connected
    /// resource.
    pub async fn update_options<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut ClusterOptions) -> T,
    {
        let mut state = self.state.lock().await;
        f(&mut state.options)
    }

    /// Drops the current resource, if any. The next access connects again.
    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        if matches!(state.connection, Connection::Connected(_)) {
            debug!("Disconnecting from redis cluster.");
        }

        state.connection = Connection::Unconnected;
        state.library_options = LibraryOptions::new();
    }

    pub async fn state(&self) -> ResourceState {
        self.state.lock().await.connection.state()
    }

    /// Declared library options merged with the values read back from the connected resource.
    /// Empty until connected.
    pub async fn merged_library_options(&self) -> LibraryOptions {
        self.state.lock().await.library_options.clone()
    }

    async fn connected_resource(
        &self,
        state: &mut ManagerState<C::Resource>,
    ) -> Result<Arc<C::Resource>> {
        if let Connection::Connected(resource) = &state.connection {
            return Ok(resource.clone());
        }

        let request = self.connect_request(&state.options)?;

        let resource = match self.connect(request).await {
            Ok(resource) => resource,
            Err(error) => {
                state.connection = Connection::Faulted;
                return Err(error);
            }
        };

        let resource = Arc::new(resource);
        state.connection = Connection::Connected(resource.clone());
        state.library_options = LibraryOptions::new();

        // the resource is kept on failure, options applied so far stay applied
        if let Err(error) = apply_library_options(&*resource, state.options.lib_options()) {
            warn!(%error, "Could not apply library options to redis cluster connection.");
            return Err(error);
        }

        let mut library_options = state.options.lib_options().clone();
        let merged = merge_library_options(&*resource, &mut library_options);
        state.library_options = library_options;

        if let Err(error) = merged {
            warn!(%error, "Could not read library options from redis cluster connection.");
            return Err(error);
        }

        Ok(resource)
    }

    fn connect_request(&self, options: &ClusterOptions) -> Result<ConnectRequest> {
        let (seeds, timeout, read_timeout, password) = match options.name() {
            Some(name) => {
                let topology = ClusterTopology::from_source(&*self.topology_source)?;
                (
                    topology.seeds(name)?.to_vec(),
                    topology.timeout(name, options.timeout()),
                    topology.read_timeout(name, options.read_timeout()),
                    topology
                        .password(name, options.password())
                        .map(str::to_string),
                )
            }
            None => (
                options.seeds().to_vec(),
                options.timeout(),
                options.read_timeout(),
                options.password().map(str::to_string),
            ),
        };

        Ok(ConnectRequest::new(
            seeds,
            optional_duration("timeout", timeout)?,
            optional_duration("read_timeout", read_timeout)?,
            options.is_persistent(),
            password.filter(|password| !password.is_empty()),
            options.ssl_context().cloned(),
        ))
    }

    async fn connect(&self, request: ConnectRequest) -> Result<C::Resource> {
        let seeds = request.seeds.join(",");
        let timeout = request.timeout;
        debug!(%seeds, ?timeout, persistent = request.persistent, "Connecting to redis cluster.");

        let connection = self.connector.connect(request);
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, connection)
                .await
                .unwrap_or_else(|_| {
                    Err(LibraryError::new(
                        format!("Timeout waiting for connection to: {seeds}"),
                        0,
                    ))
                }),
            None => connection.await,
        };

        result.map_err(|error| {
            let error =
                Error::from_connection_failure(error, Some(&self.connector as &dyn LastErrorSource));
            warn!(%error, %seeds, "Could not connect to redis cluster.");
            error
        })
    }
}

fn apply_library_options<R: ClusterResource>(
    resource: &R,
    lib_options: &LibraryOptions,
) -> Result<()> {
    for (option, value) in lib_options.iter() {
        match resource.set_option(option, value) {
            Ok(true) => trace!(option, ?value, "Applied library option."),
            Ok(false) => return Err(Error::from_internal_error(resource)),
            Err(error) => return Err(Error::from_protocol_failure(error, resource)),
        }
    }

    Ok(())
}

fn merge_library_options<R: ClusterResource>(
    resource: &R,
    library_options: &mut LibraryOptions,
) -> Result<()> {
    let declared = library_options.len();

    for option in LIBRARY_OPTIONS.iter().map(|option| option.code()) {
        if library_options.contains(option) {
            continue;
        }

        let value = resource
            .get_option(option)
            .map_err(|error| Error::from_protocol_failure(error, resource))?;
        library_options.insert(option, value);
    }

    debug!(
        declared,
        merged = library_options.len(),
        "Merged library options from redis cluster."
    );

    Ok(())
}

fn info_target(options: &ClusterOptions) -> Result<InfoTarget> {
    if let Some(name) = options.name() {
        return Ok(InfoTarget::Key(name.to_string()));
    }

    options
        .seeds()
        .first()
        .map(|seed| InfoTarget::Address(seed.clone()))
        .ok_or_else(|| {
            Error::RuntimeProtocol {
                message: "Neither the node name nor any seed is configured.".into(),
                code: 0,
                source: None,
            }
        })
}

// zero disables the client side timeout
fn optional_duration(key: &str, seconds: f64) -> Result<Option<Duration>> {
    let duration = seconds_to_duration(key, seconds)?;
    Ok((!duration.is_zero()).then_some(duration))
}
