//! TLS context options used when building secured cluster connections.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Cipher list used when none is configured.
pub const DEFAULT_CIPHERS: &str = "ECDHE-RSA-AES128-GCM-SHA256:ECDHE-ECDSA-AES128-GCM-SHA256:\
ECDHE-RSA-AES256-GCM-SHA384:ECDHE-ECDSA-AES256-GCM-SHA384:DHE-RSA-AES128-GCM-SHA256:\
DHE-DSS-AES128-GCM-SHA256:kEDH+AESGCM:ECDHE-RSA-AES128-SHA256:ECDHE-ECDSA-AES128-SHA256:\
ECDHE-RSA-AES128-SHA:ECDHE-ECDSA-AES128-SHA:ECDHE-RSA-AES256-SHA384:ECDHE-ECDSA-AES256-SHA384:\
ECDHE-RSA-AES256-SHA:ECDHE-ECDSA-AES256-SHA:DHE-RSA-AES128-SHA256:DHE-RSA-AES128-SHA:\
DHE-DSS-AES128-SHA256:DHE-RSA-AES256-SHA256:DHE-DSS-AES256-SHA:DHE-RSA-AES256-SHA:\
AES128-GCM-SHA256:AES256-GCM-SHA384:AES128:AES256:HIGH:!SSLv2:!aNULL:!eNULL:!EXPORT:!DES:\
!MD5:!RC4:!ADH";

/// Expected digest of the remote certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerFingerprint {
    /// A single digest; its length selects the algorithm (32 for md5, 40 for sha1).
    Digest(String),
    /// Expected digest per hashing algorithm name.
    Digests(BTreeMap<String, String>),
}

/// TLS context options. Maps to and from a flat key/value form using snake_case keys, except
/// for `SNI_enabled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SslContext {
    /// Peer name to be used. Guessed from the host name when not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_name: Option<String>,
    /// Require verification of the peer certificate.
    pub verify_peer: bool,
    /// Require verification of the peer name.
    pub verify_peer_name: bool,
    /// Allow self-signed certificates. Requires `verify_peer`.
    pub allow_self_signed: bool,
    /// Certificate authority file used to authenticate the remote peer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cafile: Option<String>,
    /// Hashed certificate directory searched when `cafile` has no match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capath: Option<String>,
    /// PEM encoded local certificate, optionally with its private key and chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_cert: Option<String>,
    /// Private key file when kept apart from `local_cert`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_pk: Option<String>,
    /// Passphrase `local_cert` was encoded with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// Abort if the certificate chain is deeper. No limit when not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_depth: Option<u32>,
    /// OpenSSL cipher list.
    pub ciphers: String,
    /// Server name indication.
    #[serde(rename = "SNI_enabled", skip_serializing_if = "Option::is_none")]
    pub sni_enabled: Option<bool>,
    /// Disable TLS compression.
    pub disable_compression: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_fingerprint: Option<PeerFingerprint>,
    /// OpenSSL security level. Library default when not set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_level: Option<u8>,
}

impl Default for SslContext {
    fn default() -> Self {
        SslContext {
            peer_name: None,
            verify_peer: true,
            verify_peer_name: true,
            allow_self_signed: false,
            cafile: None,
            capath: None,
            local_cert: None,
            local_pk: None,
            passphrase: None,
            verify_depth: None,
            ciphers: DEFAULT_CIPHERS.to_string(),
            sni_enabled: Some(true),
            disable_compression: true,
            peer_fingerprint: None,
            security_level: None,
        }
    }
}

impl SslContext {
    /// Builds a context from its flat key/value form. Missing keys keep their defaults.
    pub fn from_generic_map(map: &Map<String, Value>) -> Result<Self> {
        serde_json::from_value(Value::Object(map.clone()))
            .map_err(|error| Error::Configuration(format!("Invalid SSL context: {error}")))
    }

    /// Flat key/value form containing every field which is set.
    pub fn to_generic_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // plain fields always serialize into an object
            _ => Map::new(),
        }
    }

    /// A local certificate is configured for client authentication.
    pub fn has_client_cert(&self) -> bool {
        self.local_cert.is_some()
    }
}

impl TryFrom<&Map<String, Value>> for SslContext {
    type Error = Error;

    fn try_from(map: &Map<String, Value>) -> Result<Self> {
        SslContext::from_generic_map(map)
    }
}

impl From<&SslContext> for Map<String, Value> {
    fn from(context: &SslContext) -> Self {
        context.to_generic_map()
    }
}
