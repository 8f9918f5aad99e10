use std::result;
use thiserror::Error as ThisError;
use tracing::*;

#[cfg(test)]
use mockall::automock;

pub type Result<T> = result::Result<T, Error>;

const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong while interacting with redis cluster.";

/// Failure reported by the underlying client library, carrying the library's own message and
/// error code.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("{message}")]
pub struct LibraryError {
    pub message: String,
    pub code: i64,
}

impl LibraryError {
    pub fn new<S: Into<String>>(message: S, code: i64) -> Self {
        LibraryError {
            message: message.into(),
            code,
        }
    }
}

impl From<String> for LibraryError {
    fn from(message: String) -> Self {
        LibraryError::new(message, 0)
    }
}

impl From<&str> for LibraryError {
    fn from(message: &str) -> Self {
        LibraryError::new(message, 0)
    }
}

/// Anything able to describe its most recent failure. Live connections and connectors expose
/// this so error translation can prefer the remote diagnostic over generic exception text.
#[cfg_attr(test, automock)]
pub trait LastErrorSource {
    /// Returns the last error message, if one is recorded. Looking it up may itself fail.
    fn try_last_error(&self) -> result::Result<Option<String>, LibraryError> {
        Ok(None)
    }
}

/// Errors raised by the connection and configuration layer. Configuration errors are raised
/// synchronously while building options or resolving named topologies. Connection and runtime
/// protocol errors wrap a client library failure, which is kept as the error source.
#[derive(Debug, Clone, ThisError)]
pub enum Error {
    /// Invalid or contradictory configuration.
    #[error("{0}")]
    Configuration(String),
    /// The connection to the cluster could not be established.
    #[error("{message}")]
    Connection {
        message: String,
        code: i64,
        #[source]
        source: Option<LibraryError>,
    },
    /// A command failed on an already established connection.
    #[error("{message}")]
    RuntimeProtocol {
        message: String,
        code: i64,
        #[source]
        source: Option<LibraryError>,
    },
    /// The client library is not usable in this process.
    #[error("{0}")]
    ExtensionMissing(String),
}

impl Error {
    /// Translates a failed connection attempt. The connector's last error is preferred over the
    /// library error message when one can be retrieved.
    pub fn from_connection_failure(
        error: LibraryError,
        last_error: Option<&dyn LastErrorSource>,
    ) -> Self {
        let message = preferred_message(&error, last_error);
        debug!(%message, code = error.code, "Translated connection failure.");

        Error::Connection {
            message,
            code: error.code,
            source: Some(error),
        }
    }

    /// Translates a failed command on a live resource.
    pub fn from_protocol_failure(error: LibraryError, resource: &dyn LastErrorSource) -> Self {
        let message = preferred_message(&error, Some(resource));
        debug!(%message, code = error.code, "Translated protocol failure.");

        Error::RuntimeProtocol {
            message,
            code: error.code,
            source: Some(error),
        }
    }

    /// Used when an operation signalled failure without raising an error.
    pub fn from_internal_error(resource: &dyn LastErrorSource) -> Self {
        let message = match resource.try_last_error() {
            Ok(Some(message)) => message,
            Ok(None) => INTERNAL_ERROR_MESSAGE.to_string(),
            Err(lookup_error) => {
                trace!(%lookup_error, "Could not retrieve last error.");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        };

        Error::RuntimeProtocol {
            message,
            code: 0,
            source: None,
        }
    }

    /// Library error code preserved from the original failure, or 0.
    pub fn code(&self) -> i64 {
        match self {
            Error::Connection { code, .. } | Error::RuntimeProtocol { code, .. } => *code,
            Error::Configuration(_) | Error::ExtensionMissing(_) => 0,
        }
    }

    #[inline]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    #[inline]
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }

    #[inline]
    pub fn is_runtime_protocol(&self) -> bool {
        matches!(self, Error::RuntimeProtocol { .. })
    }
}

fn preferred_message(error: &LibraryError, last_error: Option<&dyn LastErrorSource>) -> String {
    let Some(source) = last_error else {
        return error.message.clone();
    };

    match source.try_last_error() {
        Ok(Some(message)) => message,
        Ok(None) => error.message.clone(),
        Err(lookup_error) => {
            trace!(%lookup_error, "Could not retrieve last error.");
            error.message.clone()
        }
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Configuration(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Error {
        Error::Configuration(err.to_string())
    }
}

pub(crate) fn missing_name_and_seeds() -> Error {
    Error::Configuration("Missing either `name` or `seeds`.".into())
}

pub(crate) fn name_and_seeds_provided() -> Error {
    Error::Configuration(
        "Please provide either `name` or `seeds` configuration, not both.".into(),
    )
}

pub(crate) fn missing_seeds_configuration(setting: &str) -> Error {
    Error::Configuration(format!(
        "Could not find `{setting}` entry in the cluster configuration source."
    ))
}

pub(crate) fn missing_seeds_for_nodename(nodename: &str, setting: &str) -> Error {
    Error::Configuration(format!(
        "Missing `{nodename}` within the configured `{setting}` entry."
    ))
}

pub(crate) fn invalid_seed(seed: &str) -> Error {
    Error::Configuration(format!(
        "Configured `seed` {seed} is invalid. Must be configured as \"host:port\" while separated by a colon."
    ))
}
