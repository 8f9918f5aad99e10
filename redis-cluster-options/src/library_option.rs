//! Client library option codes and values.
//!
//! Option codes are an externally versioned contract owned by the client library binding. The
//! table below mirrors the binding's 5.3 series and has to be refreshed together with it.
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::convert::TryFrom;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Behavioral settings understood by the client library, keyed by integer code.
#[derive(Debug, PartialEq, Clone, Copy, Display, Ord, PartialOrd, Eq, Hash)]
#[non_exhaustive]
pub enum LibraryOption {
    /// Value serializer, see [`Serializer`].
    Serializer,
    /// Key prefix applied by the library.
    Prefix,
    /// Read timeout in seconds.
    ReadTimeout,
    /// Retry behavior of SCAN-like commands.
    Scan,
    /// Replica failover mode for read commands.
    SlaveFailover,
    TcpKeepalive,
    /// Value compression algorithm.
    Compression,
    ReplyLiteral,
    CompressionLevel,
    NullMultibulkAsNull,
    MaxRetries,
    BackoffAlgorithm,
    BackoffBase,
    BackoffCap,
}

/// Every option code known to this binding version, in code order.
pub const LIBRARY_OPTIONS: &[LibraryOption] = &[
    LibraryOption::Serializer,
    LibraryOption::Prefix,
    LibraryOption::ReadTimeout,
    LibraryOption::Scan,
    LibraryOption::SlaveFailover,
    LibraryOption::TcpKeepalive,
    LibraryOption::Compression,
    LibraryOption::ReplyLiteral,
    LibraryOption::CompressionLevel,
    LibraryOption::NullMultibulkAsNull,
    LibraryOption::MaxRetries,
    LibraryOption::BackoffAlgorithm,
    LibraryOption::BackoffBase,
    LibraryOption::BackoffCap,
];

impl LibraryOption {
    #[inline]
    pub fn code(self) -> i64 {
        self.into()
    }
}

impl From<LibraryOption> for i64 {
    fn from(value: LibraryOption) -> Self {
        match value {
            LibraryOption::Serializer => 1,
            LibraryOption::Prefix => 2,
            LibraryOption::ReadTimeout => 3,
            LibraryOption::Scan => 4,
            LibraryOption::SlaveFailover => 5,
            LibraryOption::TcpKeepalive => 6,
            LibraryOption::Compression => 7,
            LibraryOption::ReplyLiteral => 8,
            LibraryOption::CompressionLevel => 9,
            LibraryOption::NullMultibulkAsNull => 10,
            LibraryOption::MaxRetries => 11,
            LibraryOption::BackoffAlgorithm => 12,
            LibraryOption::BackoffBase => 13,
            LibraryOption::BackoffCap => 14,
        }
    }
}

impl TryFrom<i64> for LibraryOption {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        LIBRARY_OPTIONS
            .iter()
            .copied()
            .find(|option| option.code() == value)
            .ok_or_else(|| Error::Configuration(format!("Unknown library option code: {value}")))
    }
}

impl FromStr for LibraryOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let option = match s {
            "OPT_SERIALIZER" => LibraryOption::Serializer,
            "OPT_PREFIX" => LibraryOption::Prefix,
            "OPT_READ_TIMEOUT" => LibraryOption::ReadTimeout,
            "OPT_SCAN" => LibraryOption::Scan,
            "OPT_SLAVE_FAILOVER" => LibraryOption::SlaveFailover,
            "OPT_TCP_KEEPALIVE" => LibraryOption::TcpKeepalive,
            "OPT_COMPRESSION" => LibraryOption::Compression,
            "OPT_REPLY_LITERAL" => LibraryOption::ReplyLiteral,
            "OPT_COMPRESSION_LEVEL" => LibraryOption::CompressionLevel,
            "OPT_NULL_MULTIBULK_AS_NULL" => LibraryOption::NullMultibulkAsNull,
            "OPT_MAX_RETRIES" => LibraryOption::MaxRetries,
            "OPT_BACKOFF_ALGORITHM" => LibraryOption::BackoffAlgorithm,
            "OPT_BACKOFF_BASE" => LibraryOption::BackoffBase,
            "OPT_BACKOFF_CAP" => LibraryOption::BackoffCap,
            _ => {
                return Err(Error::Configuration(format!(
                    "Invalid library option provided: {s}"
                )))
            }
        };

        Ok(option)
    }
}

/// Values of the [`LibraryOption::Serializer`] option.
#[derive(Debug, PartialEq, Clone, Copy, Display, Ord, PartialOrd, Eq, Hash, Default)]
pub enum Serializer {
    /// Values are stored as given.
    #[default]
    None,
    /// Native serialization of the host runtime.
    Native,
    /// Compact binary serialization.
    CompactBinary,
    Msgpack,
    Json,
}

impl From<Serializer> for i64 {
    fn from(value: Serializer) -> Self {
        match value {
            Serializer::None => 0,
            Serializer::Native => 1,
            Serializer::CompactBinary => 2,
            Serializer::Msgpack => 3,
            Serializer::Json => 4,
        }
    }
}

impl TryFrom<i64> for Serializer {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(Serializer::None),
            1 => Ok(Serializer::Native),
            2 => Ok(Serializer::CompactBinary),
            3 => Ok(Serializer::Msgpack),
            4 => Ok(Serializer::Json),
            _ => Err(Error::Configuration(format!("Unknown serializer: {value}"))),
        }
    }
}

impl From<Serializer> for LibraryOptionValue {
    fn from(value: Serializer) -> Self {
        LibraryOptionValue::Int(value.into())
    }
}

/// A library option value as accepted and reported by the client library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LibraryOptionValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl LibraryOptionValue {
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            LibraryOptionValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, LibraryOptionValue::Null)
    }
}

impl From<i64> for LibraryOptionValue {
    fn from(value: i64) -> Self {
        LibraryOptionValue::Int(value)
    }
}

impl From<f64> for LibraryOptionValue {
    fn from(value: f64) -> Self {
        LibraryOptionValue::Float(value)
    }
}

impl From<bool> for LibraryOptionValue {
    fn from(value: bool) -> Self {
        LibraryOptionValue::Bool(value)
    }
}

impl From<String> for LibraryOptionValue {
    fn from(value: String) -> Self {
        LibraryOptionValue::Str(value)
    }
}

impl From<&str> for LibraryOptionValue {
    fn from(value: &str) -> Self {
        LibraryOptionValue::Str(value.to_string())
    }
}

/// Library options keyed by code, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct LibraryOptions(Vec<(i64, LibraryOptionValue)>);

impl LibraryOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets an option. Re-declaring a code keeps its original position.
    pub fn insert<O: Into<i64>, V: Into<LibraryOptionValue>>(&mut self, option: O, value: V) {
        let option = option.into();
        let value = value.into();

        match self.0.iter_mut().find(|(code, _)| *code == option) {
            Some((_, current)) => *current = value,
            None => self.0.push((option, value)),
        }
    }

    pub fn get<O: Into<i64>>(&self, option: O) -> Option<&LibraryOptionValue> {
        let option = option.into();
        self.0
            .iter()
            .find_map(|(code, value)| (*code == option).then_some(value))
    }

    #[inline]
    pub fn contains<O: Into<i64>>(&self, option: O) -> bool {
        self.get(option).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &LibraryOptionValue)> {
        self.0.iter().map(|(code, value)| (*code, value))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The declared [`LibraryOption::Serializer`] value, if any.
    pub fn serializer(&self) -> Option<&LibraryOptionValue> {
        self.get(LibraryOption::Serializer)
    }
}

impl<O: Into<i64>, V: Into<LibraryOptionValue>> FromIterator<(O, V)> for LibraryOptions {
    fn from_iter<T: IntoIterator<Item = (O, V)>>(iter: T) -> Self {
        let mut options = LibraryOptions::new();
        for (option, value) in iter {
            options.insert(option, value);
        }

        options
    }
}

impl TryFrom<Map<String, Value>> for LibraryOptions {
    type Error = Error;

    fn try_from(map: Map<String, Value>) -> Result<Self> {
        let mut options = LibraryOptions::new();
        for (key, value) in map {
            let code = key.parse::<i64>().map_err(|_| {
                Error::Configuration(format!("Library option code must be an integer: {key}"))
            })?;
            let value = serde_json::from_value::<LibraryOptionValue>(value).map_err(|error| {
                Error::Configuration(format!("Invalid value for library option {code}: {error}"))
            })?;

            options.insert(code, value);
        }

        Ok(options)
    }
}
