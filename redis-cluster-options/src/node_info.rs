use std::collections::HashMap;

const REDIS_VERSION: &str = "redis_version";
const VALKEY_VERSION: &str = "valkey_version";

/// Information reported by a single node, as returned by the `INFO` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
    fields: HashMap<String, String>,
}

impl NodeInfo {
    /// Parses raw `INFO` output. Section headers and lines without a `:` are skipped.
    pub fn parse(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .collect()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Server version. Valkey nodes report their own version field alongside a compatibility
    /// `redis_version`, which wins when both are present.
    pub fn version(&self) -> Option<&str> {
        self.get(REDIS_VERSION)
            .filter(|version| !version.is_empty())
            .or_else(|| self.get(VALKEY_VERSION))
            .filter(|version| !version.is_empty())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, String>> for NodeInfo {
    fn from(fields: HashMap<String, String>) -> Self {
        NodeInfo { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NodeInfo {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        NodeInfo {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    const INFO: &str = "# Server\r\nredis_version:7.2.4\r\nredis_mode:cluster\r\nos:Linux\r\n\r\n# Clients\r\nconnected_clients:3\r\n";

    #[test]
    fn should_parse_info_sections() {
        let info = NodeInfo::parse(INFO);

        assert_eq!(info.len(), 4);
        assert_eq!(info.version(), Some("7.2.4"));
        assert_eq!(info.get("redis_mode"), Some("cluster"));
        assert_eq!(info.get("connected_clients"), Some("3"));
        assert_eq!(info.get("# Server"), None);
    }

    #[test]
    fn should_fall_back_to_valkey_version() {
        let info = NodeInfo::from(hashmap! {
            "valkey_version".to_string() => "8.0.1".to_string(),
        });
        assert_eq!(info.version(), Some("8.0.1"));

        let info: NodeInfo = [("redis_version", "7.2.4"), ("valkey_version", "8.0.1")]
            .into_iter()
            .collect();
        assert_eq!(info.version(), Some("7.2.4"));
    }

    #[test]
    fn should_skip_empty_redis_version() {
        let info = NodeInfo::parse("# Server\r\nredis_version:\r\nvalkey_version:8.0.1\r\n");
        assert_eq!(info.version(), Some("8.0.1"));
    }

    #[test]
    fn should_report_missing_version() {
        assert_eq!(NodeInfo::parse("os:Linux").version(), None);
        assert_eq!(NodeInfo::parse("redis_version:").version(), None);
        assert!(NodeInfo::default().is_empty());
    }
}
