// crates/engine/src/domain/manager.rs

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::policy::TrustPolicy;

/// Registry of trust policies keyed by host name.
///
/// Owned by the caller's composition root; there is no process-wide instance.
#[derive(Default, Clone)]
pub struct TrustManager {
    policies: HashMap<String, Arc<dyn TrustPolicy>>,
}

impl TrustManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policies(policies: impl IntoIterator<Item = Arc<dyn TrustPolicy>>) -> Self {
        let mut manager = Self::new();
        manager.add_all(policies);
        manager
    }

    /// Register `policy` under its host name, replacing any previous policy.
    pub fn add(&mut self, policy: Arc<dyn TrustPolicy>) {
        self.policies.insert(policy.host_name().to_string(), policy);
    }

    pub fn add_all(&mut self, policies: impl IntoIterator<Item = Arc<dyn TrustPolicy>>) {
        for policy in policies {
            self.add(policy);
        }
    }

    pub fn policy(&self, host_name: &str) -> Option<Arc<dyn TrustPolicy>> {
        self.policies.get(host_name).cloned()
    }

    pub fn all_host_names(&self) -> Vec<String> {
        self.policies.keys().cloned().collect()
    }

    pub fn all_policies(&self) -> Vec<Arc<dyn TrustPolicy>> {
        self.policies.values().cloned().collect()
    }

    pub fn remove(&mut self, host_name: &str) -> Option<Arc<dyn TrustPolicy>> {
        self.policies.remove(host_name)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl std::fmt::Debug for TrustManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut hosts = self.all_host_names();
        hosts.sort();
        f.debug_struct("TrustManager").field("hosts", &hosts).finish()
    }
}
