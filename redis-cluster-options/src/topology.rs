//! Resolution of named cluster configurations.
//!
//! A named cluster is configured through query-string encoded settings, keyed by nodename:
//!
//! ```text
//! redis.clusters.seeds        = "foo[]=localhost:7000&foo[]=localhost:7001"
//! redis.clusters.timeout      = "foo=1.5"
//! redis.clusters.read_timeout = "foo=2.5"
//! redis.clusters.auth         = "foo=secret"
//! ```
use std::collections::HashMap;
use std::env;
use tracing::*;
use url::form_urlencoded;

use crate::cluster_options::seconds_to_duration;
use crate::error::{self, Error, Result};

pub const SEEDS_SETTING: &str = "redis.clusters.seeds";
pub const TIMEOUT_SETTING: &str = "redis.clusters.timeout";
pub const READ_TIMEOUT_SETTING: &str = "redis.clusters.read_timeout";
pub const AUTH_SETTING: &str = "redis.clusters.auth";

/// Source of named cluster settings.
pub trait TopologySource {
    /// Returns the raw value of a setting, if present.
    fn setting(&self, key: &str) -> Option<String>;
}

/// Settings given as literal values.
#[derive(Clone, Debug, Default)]
pub struct StaticTopologySource {
    settings: HashMap<String, String>,
}

impl StaticTopologySource {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_setting<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn with_seeds<V: Into<String>>(self, value: V) -> Self {
        self.with_setting(SEEDS_SETTING, value)
    }

    pub fn with_timeouts<V: Into<String>>(self, value: V) -> Self {
        self.with_setting(TIMEOUT_SETTING, value)
    }

    pub fn with_read_timeouts<V: Into<String>>(self, value: V) -> Self {
        self.with_setting(READ_TIMEOUT_SETTING, value)
    }

    pub fn with_auth<V: Into<String>>(self, value: V) -> Self {
        self.with_setting(AUTH_SETTING, value)
    }
}

impl TopologySource for StaticTopologySource {
    fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }
}

/// Reads settings from the process environment. `redis.clusters.seeds` is read from
/// `REDIS_CLUSTERS_SEEDS` and so on.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvTopologySource;

impl EnvTopologySource {
    pub fn variable_name(key: &str) -> String {
        key.replace('.', "_").to_uppercase()
    }
}

impl TopologySource for EnvTopologySource {
    fn setting(&self, key: &str) -> Option<String> {
        env::var(Self::variable_name(key)).ok()
    }
}

/// Named cluster configurations resolved from a [`TopologySource`].
#[derive(Clone, Debug, Default)]
pub struct ClusterTopology {
    seeds_by_nodename: HashMap<String, Vec<String>>,
    timeout_by_nodename: HashMap<String, f64>,
    read_timeout_by_nodename: HashMap<String, f64>,
    password_by_nodename: HashMap<String, String>,
}

impl ClusterTopology {
    /// Reads all settings. Fails if no seeds are configured at all.
    pub fn from_source(source: &dyn TopologySource) -> Result<Self> {
        let seeds = source
            .setting(SEEDS_SETTING)
            .filter(|seeds| !seeds.is_empty())
            .ok_or_else(|| error::missing_seeds_configuration(SEEDS_SETTING))?;

        let seeds_by_nodename = parse_seeds(&seeds);
        if seeds_by_nodename.is_empty() {
            return Err(error::missing_seeds_configuration(SEEDS_SETTING));
        }

        let timeout_by_nodename = parse_seconds(source, TIMEOUT_SETTING)?;
        let read_timeout_by_nodename = parse_seconds(source, READ_TIMEOUT_SETTING)?;
        let password_by_nodename = source
            .setting(AUTH_SETTING)
            .map(|auth| parse_scalars(&auth))
            .unwrap_or_default();

        debug!(
            nodenames = seeds_by_nodename.len(),
            "Loaded named cluster configuration."
        );

        Ok(ClusterTopology {
            seeds_by_nodename,
            timeout_by_nodename,
            read_timeout_by_nodename,
            password_by_nodename,
        })
    }

    /// Seeds configured for given nodename.
    pub fn seeds(&self, nodename: &str) -> Result<&[String]> {
        self.seeds_by_nodename
            .get(nodename)
            .filter(|seeds| !seeds.is_empty())
            .map(Vec::as_slice)
            .ok_or_else(|| error::missing_seeds_for_nodename(nodename, SEEDS_SETTING))
    }

    pub fn timeout(&self, nodename: &str, fallback: f64) -> f64 {
        self.timeout_by_nodename
            .get(nodename)
            .copied()
            .unwrap_or(fallback)
    }

    pub fn read_timeout(&self, nodename: &str, fallback: f64) -> f64 {
        self.read_timeout_by_nodename
            .get(nodename)
            .copied()
            .unwrap_or(fallback)
    }

    pub fn password<'a>(&'a self, nodename: &str, fallback: Option<&'a str>) -> Option<&'a str> {
        self.password_by_nodename
            .get(nodename)
            .map(String::as_str)
            .or(fallback)
    }

    /// All configured nodenames.
    pub fn nodenames(&self) -> impl Iterator<Item = &str> {
        self.seeds_by_nodename.keys().map(String::as_str)
    }
}

// `name[]=value` and `name[index]=value` append to the list of `name`, a plain `name=value`
// replaces it
fn parse_seeds(input: &str) -> HashMap<String, Vec<String>> {
    let mut seeds_by_nodename: HashMap<String, Vec<String>> = HashMap::new();

    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        match key.split_once('[') {
            Some((nodename, _)) if !nodename.is_empty() => seeds_by_nodename
                .entry(nodename.to_string())
                .or_default()
                .push(value.into_owned()),
            Some(_) => {}
            None if !key.is_empty() => {
                seeds_by_nodename.insert(key.into_owned(), vec![value.into_owned()]);
            }
            None => {}
        }
    }

    seeds_by_nodename
}

fn parse_scalars(input: &str) -> HashMap<String, String> {
    form_urlencoded::parse(input.as_bytes())
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn parse_seconds(source: &dyn TopologySource, setting: &str) -> Result<HashMap<String, f64>> {
    let Some(input) = source.setting(setting) else {
        return Ok(HashMap::new());
    };

    parse_scalars(&input)
        .into_iter()
        .map(|(nodename, value)| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|seconds| seconds_to_duration(setting, *seconds).is_ok())
                .map(|seconds| (nodename.clone(), seconds))
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "Invalid `{setting}` value for `{nodename}`: {value}"
                    ))
                })
        })
        .collect()
}
