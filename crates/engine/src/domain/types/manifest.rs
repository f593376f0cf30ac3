use serde::{Deserialize, Serialize};

use crate::domain::error::{TrustError, TrustResult};

/// Pinning manifest distributed by the trust server.
///
/// Wire format (inside the signed envelope):
/// `{ "customer": "..", "timestamp": <epoch secs>, "hashes": [ { "hostname": "..", "fp": [..], "pk": [..] } ] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePinningManifest {
    pub customer: String,
    /// Signing time in seconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub timestamp_epoch_seconds: f64,
    #[serde(rename = "hashes")]
    pub per_host_entries: Vec<HostPinEntry>,
}

/// Pins for a single host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPinEntry {
    pub hostname: String,
    /// Lower-case hex SHA-256 digests of pinned certificates.
    #[serde(rename = "fp", default)]
    pub fingerprints: Vec<String>,
    /// Base64 DER public keys.
    #[serde(rename = "pk", default)]
    pub public_keys_b64: Vec<String>,
    /// Informational; the signing tool records the port it probed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl RemotePinningManifest {
    /// Parse the inner payload of a verified envelope.
    pub fn from_json(bytes: &[u8]) -> TrustResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| TrustError::Manifest(e.to_string()))
    }

    pub fn entry_for(&self, host_name: &str) -> Option<&HostPinEntry> {
        self.per_host_entries.iter().find(|e| e.hostname == host_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signing_tool_payload() {
        let json = br#"{"customer":"acme","hashes":[{"hostname":"api.example.com","port":"443","fp":["ab"],"pk":["AAAA"]}],"timestamp":1700000000}"#;
        let m = RemotePinningManifest::from_json(json).unwrap();
        assert_eq!(m.customer, "acme");
        assert_eq!(m.timestamp_epoch_seconds, 1_700_000_000.0);
        let entry = m.entry_for("api.example.com").unwrap();
        assert_eq!(entry.fingerprints, vec!["ab".to_string()]);
        assert_eq!(entry.public_keys_b64, vec!["AAAA".to_string()]);
        assert!(m.entry_for("other.example.com").is_none());
    }

    #[test]
    fn entries_without_pins_are_accepted() {
        let json = br#"{"customer":"acme","timestamp":1,"hashes":[{"hostname":"h"}]}"#;
        let m = RemotePinningManifest::from_json(json).unwrap();
        assert!(m.per_host_entries[0].fingerprints.is_empty());
        assert!(m.per_host_entries[0].public_keys_b64.is_empty());
    }

    #[test]
    fn missing_or_mistyped_fields_are_schema_violations() {
        for json in [
            &br#"{"timestamp":1,"hashes":[]}"#[..],
            br#"{"customer":"acme","hashes":[]}"#,
            br#"{"customer":"acme","timestamp":1}"#,
            br#"{"customer":"acme","timestamp":"1","hashes":[]}"#,
            br#"{"customer":"acme","timestamp":1,"hashes":[{"fp":[]}]}"#,
            br#"not json"#,
        ] {
            let err = RemotePinningManifest::from_json(json).unwrap_err();
            assert!(matches!(err, TrustError::Manifest(_)), "{err}");
        }
    }
}
