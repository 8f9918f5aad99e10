use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::*;

use crate::error::{self, Error, Result};
use crate::library_option::{LibraryOptionValue, LibraryOptions};
use crate::ssl_context::SslContext;

pub const DEFAULT_TIMEOUT: f64 = 1.0;
pub const DEFAULT_READ_TIMEOUT: f64 = 2.0;
pub const DEFAULT_NAMESPACE_SEPARATOR: &str = ":";

// literal pattern, covered by the version validation tests
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)+(-[0-9A-Za-z.]+)?$").unwrap());

fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() {
        return Err(Error::Configuration(
            "`redis_version` must not be empty.".into(),
        ));
    }

    if !VERSION_PATTERN.is_match(version) {
        return Err(Error::Configuration(format!(
            "`redis_version` {version} is not a valid version."
        )));
    }

    Ok(())
}

fn validate_seed(seed: &str) -> Result<()> {
    let valid = seed
        .rsplit_once(':')
        .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(error::invalid_seed(seed))
    }
}

fn validate_timeout(key: &str, timeout: f64) -> Result<()> {
    seconds_to_duration(key, timeout).map(|_| ())
}

/// Converts seconds into a [`Duration`], rejecting negative, non-finite and too large values.
pub fn seconds_to_duration(key: &str, seconds: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        Error::Configuration(format!(
            "`{key}` must be a non-negative number of seconds, got {seconds}."
        ))
    })
}

/// Validated options addressing a redis cluster either by a configured name, resolved through
/// the named topology source, or by explicit seeds. Exactly one of both is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterOptions {
    name: Option<String>,
    seeds: Vec<String>,
    timeout: f64,
    read_timeout: f64,
    persistent: bool,
    lib_options: LibraryOptions,
    redis_version: Option<String>,
    password: Option<String>,
    ssl_context: Option<SslContext>,
    namespace: String,
    namespace_separator: String,
}

impl ClusterOptions {
    /// Builds options from a flat key/value configuration map.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        Self::from_value(Value::Object(map.clone()))
    }

    /// Builds options from a configuration value, which has to be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::Configuration(
                "Cluster options must be a key/value map.".into(),
            ));
        }

        let raw: RawClusterOptions = serde_json::from_value(value)
            .map_err(|error| Error::Configuration(format!("Invalid cluster options: {error}")))?;

        raw.into_builder()?.build()
    }

    #[inline]
    pub fn builder() -> ClusterOptionsBuilder {
        ClusterOptionsBuilder::new()
    }

    #[inline]
    pub fn has_name(&self) -> bool {
        self.name.is_some()
    }

    /// Name of the cluster configuration to resolve, if addressed by name.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Explicit seeds; empty when addressed by name.
    #[inline]
    pub fn seeds(&self) -> &[String] {
        &self.seeds
    }

    /// Connect timeout in seconds.
    #[inline]
    pub fn timeout(&self) -> f64 {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: f64) -> Result<()> {
        validate_timeout("timeout", timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    /// Read timeout in seconds.
    #[inline]
    pub fn read_timeout(&self) -> f64 {
        self.read_timeout
    }

    pub fn set_read_timeout(&mut self, read_timeout: f64) -> Result<()> {
        validate_timeout("read_timeout", read_timeout)?;
        self.read_timeout = read_timeout;
        Ok(())
    }

    #[inline]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn set_persistent(&mut self, persistent: bool) {
        self.persistent = persistent;
    }

    /// Library options declared by the caller, in declaration order.
    #[inline]
    pub fn lib_options(&self) -> &LibraryOptions {
        &self.lib_options
    }

    pub fn set_lib_options(&mut self, lib_options: LibraryOptions) {
        self.lib_options = lib_options;
    }

    pub fn set_lib_option<O: Into<i64>, V: Into<LibraryOptionValue>>(
        &mut self,
        option: O,
        value: V,
    ) {
        self.lib_options.insert(option, value);
    }

    /// Declared or previously discovered server version.
    #[inline]
    pub fn redis_version(&self) -> Option<&str> {
        self.redis_version.as_deref()
    }

    pub fn set_redis_version<S: Into<String>>(&mut self, version: S) -> Result<()> {
        let version = version.into();
        validate_version(&version)?;

        self.redis_version = Some(version);
        Ok(())
    }

    #[inline]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn set_password(&mut self, password: Option<String>) {
        self.password = password;
    }

    #[inline]
    pub fn ssl_context(&self) -> Option<&SslContext> {
        self.ssl_context.as_ref()
    }

    pub fn set_ssl_context(&mut self, ssl_context: Option<SslContext>) {
        self.ssl_context = ssl_context;
    }

    /// Cache namespace used by the adapter layer to prefix keys.
    #[inline]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn set_namespace<S: Into<String>>(&mut self, namespace: S) {
        self.namespace = namespace.into();
    }

    #[inline]
    pub fn namespace_separator(&self) -> &str {
        &self.namespace_separator
    }

    pub fn set_namespace_separator<S: Into<String>>(&mut self, namespace_separator: S) {
        let namespace_separator = namespace_separator.into();
        if self.namespace_separator != namespace_separator {
            debug!(%namespace_separator, "Namespace separator changed.");
            self.namespace_separator = namespace_separator;
        }
    }
}

/// Builder structure that helps to configure cluster options.
pub struct ClusterOptionsBuilder {
    name: Option<String>,
    seeds: Vec<String>,
    timeout: f64,
    read_timeout: f64,
    persistent: bool,
    lib_options: LibraryOptions,
    redis_version: Option<String>,
    password: Option<String>,
    ssl_context: Option<SslContext>,
    namespace: String,
    namespace_separator: String,
}

impl Default for ClusterOptionsBuilder {
    fn default() -> Self {
        ClusterOptionsBuilder {
            name: None,
            seeds: vec![],
            timeout: DEFAULT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            persistent: false,
            lib_options: Default::default(),
            redis_version: None,
            password: None,
            ssl_context: None,
            namespace: String::new(),
            namespace_separator: DEFAULT_NAMESPACE_SEPARATOR.to_string(),
        }
    }
}

impl ClusterOptionsBuilder {
    pub fn new() -> ClusterOptionsBuilder {
        Default::default()
    }

    /// Addresses the cluster by a name resolved through the named topology source.
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a `host:port` seed.
    pub fn with_seed<S: Into<String>>(mut self, seed: S) -> Self {
        self.seeds.push(seed.into());
        self
    }

    pub fn with_seeds<I, S>(mut self, seeds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeds.extend(seeds.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, timeout: f64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: f64) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_lib_option<O: Into<i64>, V: Into<LibraryOptionValue>>(
        mut self,
        option: O,
        value: V,
    ) -> Self {
        self.lib_options.insert(option, value);
        self
    }

    pub fn with_lib_options(mut self, lib_options: LibraryOptions) -> Self {
        self.lib_options = lib_options;
        self
    }

    pub fn with_redis_version<S: Into<String>>(mut self, version: S) -> Self {
        self.redis_version = Some(version.into());
        self
    }

    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_ssl_context(mut self, ssl_context: SslContext) -> Self {
        self.ssl_context = Some(ssl_context);
        self
    }

    pub fn with_namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_namespace_separator<S: Into<String>>(mut self, namespace_separator: S) -> Self {
        self.namespace_separator = namespace_separator.into();
        self
    }

    /// Finalizes building process
    pub fn build(self) -> Result<ClusterOptions> {
        let name = self.name.filter(|name| !name.is_empty());
        let has_seeds = !self.seeds.is_empty();

        match (name.is_some(), has_seeds) {
            (false, false) => return Err(error::missing_name_and_seeds()),
            (true, true) => return Err(error::name_and_seeds_provided()),
            _ => {}
        }

        for seed in &self.seeds {
            validate_seed(seed)?;
        }

        validate_timeout("timeout", self.timeout)?;
        validate_timeout("read_timeout", self.read_timeout)?;

        if let Some(version) = &self.redis_version {
            validate_version(version)?;
        }

        Ok(ClusterOptions {
            name,
            seeds: self.seeds,
            timeout: self.timeout,
            read_timeout: self.read_timeout,
            persistent: self.persistent,
            lib_options: self.lib_options,
            redis_version: self.redis_version,
            password: self.password,
            ssl_context: self.ssl_context,
            namespace: self.namespace,
            namespace_separator: self.namespace_separator,
        })
    }
}

#[derive(Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct RawClusterOptions {
    name: Option<String>,
    seeds: Option<Vec<String>>,
    timeout: Option<f64>,
    read_timeout: Option<f64>,
    persistent: Option<bool>,
    redis_version: Option<String>,
    password: Option<String>,
    lib_options: Option<LibraryOptions>,
    ssl_context: Option<Map<String, Value>>,
    namespace: Option<String>,
    namespace_separator: Option<String>,
}

impl RawClusterOptions {
    fn into_builder(self) -> Result<ClusterOptionsBuilder> {
        let mut builder = ClusterOptionsBuilder::new();

        if let Some(name) = self.name {
            builder = builder.with_name(name);
        }
        if let Some(seeds) = self.seeds {
            builder = builder.with_seeds(seeds);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.with_timeout(timeout);
        }
        if let Some(read_timeout) = self.read_timeout {
            builder = builder.with_read_timeout(read_timeout);
        }
        if let Some(persistent) = self.persistent {
            builder = builder.with_persistent(persistent);
        }
        if let Some(version) = self.redis_version {
            builder = builder.with_redis_version(version);
        }
        if let Some(password) = self.password {
            builder = builder.with_password(password);
        }
        if let Some(lib_options) = self.lib_options {
            builder = builder.with_lib_options(lib_options);
        }
        if let Some(ssl_context) = self.ssl_context {
            builder = builder.with_ssl_context(SslContext::from_generic_map(&ssl_context)?);
        }
        if let Some(namespace) = self.namespace {
            builder = builder.with_namespace(namespace);
        }
        if let Some(namespace_separator) = self.namespace_separator {
            builder = builder.with_namespace_separator(namespace_separator);
        }

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library_option::{LibraryOption, Serializer};
    use float_eq::assert_float_eq;
    use serde_json::json;

    #[test]
    fn should_handle_options_with_name() {
        let options = ClusterOptions::from_value(json!({
            "name": "foo",
            "timeout": 1.0,
            "read_timeout": 2.0,
            "persistent": false,
            "redis_version": "1.0",
            "password": "secret",
            "ssl_context": {"verify_peer": false},
        }))
        .unwrap();

        assert_eq!(options.name(), Some("foo"));
        assert!(options.seeds().is_empty());
        assert_float_eq!(options.timeout(), 1.0, abs <= f64::EPSILON);
        assert_float_eq!(options.read_timeout(), 2.0, abs <= f64::EPSILON);
        assert!(!options.is_persistent());
        assert_eq!(options.redis_version(), Some("1.0"));
        assert_eq!(options.password(), Some("secret"));
        assert_eq!(
            options.ssl_context().map(|context| context.verify_peer),
            Some(false)
        );
    }

    #[test]
    fn should_handle_options_with_seeds() {
        let options = ClusterOptions::from_value(json!({
            "seeds": ["localhost:1234"],
            "persistent": true,
            "namespace": "app",
            "namespace_separator": "::",
            "lib_options": {"1": 1, "2": "app:"},
        }))
        .unwrap();

        assert!(!options.has_name());
        assert_eq!(options.seeds(), ["localhost:1234".to_string()]);
        assert_float_eq!(options.timeout(), DEFAULT_TIMEOUT, abs <= f64::EPSILON);
        assert_float_eq!(
            options.read_timeout(),
            DEFAULT_READ_TIMEOUT,
            abs <= f64::EPSILON
        );
        assert!(options.is_persistent());
        assert_eq!(options.namespace(), "app");
        assert_eq!(options.namespace_separator(), "::");
        assert_eq!(
            options.lib_options().serializer(),
            Some(&LibraryOptionValue::from(Serializer::Native))
        );
    }

    #[test]
    fn should_detect_name_and_seeds() {
        let error = ClusterOptions::from_value(json!({
            "seeds": ["localhost:1234"],
            "name": "foo",
        }))
        .unwrap_err();

        assert!(error.is_configuration());
        assert_eq!(
            error.to_string(),
            "Please provide either `name` or `seeds` configuration, not both."
        );
    }

    #[test]
    fn should_detect_missing_required_values() {
        let error = ClusterOptions::from_value(json!({})).unwrap_err();
        assert_eq!(error.to_string(), "Missing either `name` or `seeds`.");

        let error = ClusterOptions::from_value(json!({"name": "", "seeds": []})).unwrap_err();
        assert_eq!(error.to_string(), "Missing either `name` or `seeds`.");
    }

    #[test]
    fn should_validate_version_format() {
        let error = ClusterOptions::builder()
            .with_name("foo")
            .with_redis_version("foo")
            .build()
            .unwrap_err();
        assert!(error.is_configuration());

        let error = ClusterOptions::builder()
            .with_name("foo")
            .with_redis_version("")
            .build()
            .unwrap_err();
        assert!(error.is_configuration());

        let options = ClusterOptions::builder()
            .with_name("foo")
            .with_redis_version("7.2.4")
            .build()
            .unwrap();
        assert_eq!(options.redis_version(), Some("7.2.4"));
    }

    #[test]
    fn should_validate_seeds() {
        for seed in ["localhost", "localhost:", ":7000", "localhost:port", ""] {
            let error = ClusterOptions::builder()
                .with_seed(seed)
                .build()
                .unwrap_err();
            assert!(error.is_configuration(), "{seed} should be rejected");
        }

        assert!(ClusterOptions::builder()
            .with_seeds(["10.0.0.1:7000", "[::1]:7001"])
            .build()
            .is_ok());
    }

    #[test]
    fn should_reject_unknown_keys_and_wrong_types() {
        assert!(ClusterOptions::from_value(json!({"seeds": ["a:1"], "nodename": "foo"})).is_err());
        assert!(ClusterOptions::from_value(json!({"seeds": ["a:1"], "timeout": "1"})).is_err());
        assert!(ClusterOptions::from_value(json!({"seeds": ["a:1"], "timeout": -1.0})).is_err());
        assert!(ClusterOptions::from_value(json!(["a:1"])).is_err());
        assert!(ClusterOptions::from_value(json!({
            "seeds": ["a:1"],
            "ssl_context": {"unknown": true},
        }))
        .is_err());
    }

    #[test]
    fn should_allow_mutation_after_construction() {
        let mut options = ClusterOptions::builder()
            .with_seed("localhost:7000")
            .build()
            .unwrap();

        options.set_timeout(0.5).unwrap();
        options.set_read_timeout(3.0).unwrap();
        options.set_persistent(true);
        options.set_namespace_separator("|");
        options.set_lib_option(LibraryOption::Serializer, Serializer::CompactBinary);

        assert_float_eq!(options.timeout(), 0.5, abs <= f64::EPSILON);
        assert_float_eq!(options.read_timeout(), 3.0, abs <= f64::EPSILON);
        assert!(options.is_persistent());
        assert_eq!(options.namespace_separator(), "|");
        assert_eq!(
            options
                .lib_options()
                .serializer()
                .and_then(LibraryOptionValue::as_int),
            Some(2)
        );

        assert!(options.set_redis_version("not a version").is_err());
        assert_eq!(options.redis_version(), None);
        assert!(options.set_timeout(f64::NAN).is_err());
    }

    #[test]
    fn should_convert_seconds_to_duration() {
        assert_eq!(
            seconds_to_duration("timeout", 1.5).unwrap(),
            Duration::from_millis(1500)
        );
        assert!(seconds_to_duration("timeout", -0.1).is_err());
        assert!(seconds_to_duration("timeout", f64::INFINITY).is_err());
        assert!(seconds_to_duration("timeout", 1e30)
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn should_reject_timeouts_out_of_duration_range() {
        let error = ClusterOptions::builder()
            .with_seed("localhost:7000")
            .with_timeout(1e30)
            .build()
            .unwrap_err();
        assert!(error.is_configuration());

        assert!(ClusterOptions::builder()
            .with_seed("localhost:7000")
            .with_read_timeout(1e300)
            .build()
            .is_err());

        let mut options = ClusterOptions::builder()
            .with_seed("localhost:7000")
            .build()
            .unwrap();
        assert!(options.set_timeout(1e30).is_err());
        assert_float_eq!(options.timeout(), DEFAULT_TIMEOUT, abs <= f64::EPSILON);
    }
}
