use futures::FutureExt;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis_cluster_resource::future::BoxFuture;
use redis_cluster_resource::library_option::{LibraryOptionValue, LIBRARY_OPTIONS};
use redis_cluster_resource::node_info::NodeInfo;
use redis_cluster_resource::topology::StaticTopologySource;
use redis_cluster_resource::{
    ClusterConnector, ClusterResource, ClusterResourceManager, ConnectRequest, InfoTarget,
};
use redis_cluster_resource::cluster_options::ClusterOptions;
use redis_cluster_resource::error::{LastErrorSource, LibraryError};

pub const INFO: &str = "# Server\r\nredis_version:7.2.4\r\nredis_mode:cluster\r\n";

/// Scripted behavior of the in-memory client library, and a record of how it was used.
#[derive(Default)]
pub struct Script {
    pub unavailable: bool,
    pub connect_delay: Option<Duration>,
    pub connect_failures: Mutex<VecDeque<LibraryError>>,
    pub connector_last_error: Option<String>,
    pub resource_last_error: Option<String>,
    pub refused_options: HashSet<i64>,
    pub failing_options: HashMap<i64, LibraryError>,
    pub failing_reads: HashMap<i64, LibraryError>,
    pub info_text: String,
    pub info_failure: Option<LibraryError>,

    pub connects: AtomicUsize,
    pub info_calls: AtomicUsize,
    pub requests: Mutex<Vec<ConnectRequest>>,
    pub applied: Mutex<Vec<(i64, LibraryOptionValue)>>,
    pub info_targets: Mutex<Vec<InfoTarget>>,
}

#[allow(dead_code)]
impl Script {
    pub fn new() -> Self {
        Script {
            info_text: INFO.to_string(),
            ..Default::default()
        }
    }

    pub fn failing_connect(self, error: LibraryError) -> Self {
        self.connect_failures.lock().unwrap().push_back(error);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> usize {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> ConnectRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    pub fn applied_codes(&self) -> Vec<i64> {
        self.applied
            .lock()
            .unwrap()
            .iter()
            .map(|(code, _)| *code)
            .collect()
    }
}

pub struct FakeConnector {
    script: Arc<Script>,
}

impl FakeConnector {
    pub fn new(script: Arc<Script>) -> Self {
        FakeConnector { script }
    }
}

impl LastErrorSource for FakeConnector {
    fn try_last_error(&self) -> Result<Option<String>, LibraryError> {
        Ok(self.script.connector_last_error.clone())
    }
}

impl ClusterConnector for FakeConnector {
    type Resource = FakeResource;

    fn is_available(&self) -> bool {
        !self.script.unavailable
    }

    fn connect(&self, request: ConnectRequest) -> BoxFuture<Result<FakeResource, LibraryError>> {
        let script = self.script.clone();
        async move {
            script.connects.fetch_add(1, Ordering::SeqCst);
            script.requests.lock().unwrap().push(request);

            if let Some(delay) = script.connect_delay {
                tokio::time::sleep(delay).await;
            }

            let failure = script.connect_failures.lock().unwrap().pop_front();
            match failure {
                Some(error) => Err(error),
                None => Ok(FakeResource::new(script)),
            }
        }
        .boxed()
    }
}

pub struct FakeResource {
    script: Arc<Script>,
    options: Mutex<HashMap<i64, LibraryOptionValue>>,
}

impl FakeResource {
    fn new(script: Arc<Script>) -> Self {
        let options = LIBRARY_OPTIONS
            .iter()
            .map(|option| (option.code(), LibraryOptionValue::Int(0)))
            .collect();

        FakeResource {
            script,
            options: Mutex::new(options),
        }
    }
}

impl fmt::Debug for FakeResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeResource")
            .field("options", &self.options)
            .finish()
    }
}

impl LastErrorSource for FakeResource {
    fn try_last_error(&self) -> Result<Option<String>, LibraryError> {
        Ok(self.script.resource_last_error.clone())
    }
}

impl ClusterResource for FakeResource {
    fn set_option(&self, option: i64, value: &LibraryOptionValue) -> Result<bool, LibraryError> {
        if let Some(error) = self.script.failing_options.get(&option) {
            return Err(error.clone());
        }

        if self.script.refused_options.contains(&option) {
            return Ok(false);
        }

        self.script
            .applied
            .lock()
            .unwrap()
            .push((option, value.clone()));
        self.options.lock().unwrap().insert(option, value.clone());
        Ok(true)
    }

    fn get_option(&self, option: i64) -> Result<LibraryOptionValue, LibraryError> {
        if let Some(error) = self.script.failing_reads.get(&option) {
            return Err(error.clone());
        }

        Ok(self
            .options
            .lock()
            .unwrap()
            .get(&option)
            .cloned()
            .unwrap_or(LibraryOptionValue::Bool(false)))
    }

    fn info(&self, target: &InfoTarget) -> BoxFuture<Result<NodeInfo, LibraryError>> {
        let script = self.script.clone();
        let target = target.clone();
        async move {
            script.info_calls.fetch_add(1, Ordering::SeqCst);
            script.info_targets.lock().unwrap().push(target);

            match &script.info_failure {
                Some(error) => Err(error.clone()),
                None => Ok(NodeInfo::parse(&script.info_text)),
            }
        }
        .boxed()
    }
}

#[allow(dead_code)]
pub fn manager(
    options: ClusterOptions,
    script: &Arc<Script>,
) -> ClusterResourceManager<FakeConnector> {
    manager_with_topology(options, script, StaticTopologySource::new())
}

pub fn manager_with_topology(
    options: ClusterOptions,
    script: &Arc<Script>,
    topology: StaticTopologySource,
) -> ClusterResourceManager<FakeConnector> {
    ClusterResourceManager::with_topology_source(
        options,
        FakeConnector::new(script.clone()),
        Arc::new(topology),
    )
    .unwrap()
}

#[allow(dead_code)]
pub fn seed_options() -> ClusterOptions {
    ClusterOptions::builder()
        .with_seed("localhost:7000")
        .build()
        .unwrap()
}
