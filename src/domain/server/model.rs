use std::fmt;

use serde::{Deserialize, Serialize};

/// Power state reported by Hyper-V for a running machine.
pub const POWER_RUNNING: &str = "Running";
/// Power state reported by Hyper-V for a stopped machine.
pub const POWER_OFF: &str = "Off";
/// Network state of a machine whose adapter is not connected to any switch.
pub const NETWORK_DISCONNECTED: &str = "";

/// Virtual machine record.
///
/// Identity and metadata come from the persisted store; `state` and
/// `network` are only authoritative inside the state cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Store-assigned id, `0` when the record has not been persisted.
    pub id: i64,
    /// Id assigned by the virtualization host.
    pub vm_id: String,
    pub name: String,
    /// Owning virtualization host.
    pub hv: String,
    pub ip: String,
    pub out_addr: String,
    pub company: String,
    pub description: String,
    pub state: String,
    pub network: String,
}

impl Server {
    pub fn key(&self) -> ServerKey {
        ServerKey::new(&self.name, &self.hv)
    }

    pub fn matches(&self, key: &ServerKey) -> bool {
        self.name == key.name && self.hv == key.hv
    }

    /// Copy persisted identity and metadata onto a live record.
    pub fn merge_metadata(&mut self, stored: &Server) {
        self.id = stored.id;
        self.ip = stored.ip.clone();
        self.out_addr = stored.out_addr.clone();
        self.company = stored.company.clone();
        self.description = stored.description.clone();
        if self.vm_id.is_empty() {
            self.vm_id = stored.vm_id.clone();
        }
    }
}

/// Composite cache key: machine name plus owning host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerKey {
    pub name: String,
    pub hv: String,
}

impl ServerKey {
    pub fn new(name: impl Into<String>, hv: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hv: hv.into(),
        }
    }
}

impl fmt::Display for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.hv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_metadata_keeps_live_state() {
        let mut live = Server {
            vm_id: "vm-1".into(),
            name: "web01".into(),
            hv: "hv-a".into(),
            state: POWER_RUNNING.into(),
            network: "DMZ".into(),
            ..Default::default()
        };
        let stored = Server {
            id: 9,
            vm_id: "vm-1".into(),
            name: "web01".into(),
            hv: "hv-a".into(),
            ip: "10.0.0.5".into(),
            company: "ACME".into(),
            state: "stale".into(),
            ..Default::default()
        };

        live.merge_metadata(&stored);

        assert_eq!(live.id, 9);
        assert_eq!(live.ip, "10.0.0.5");
        assert_eq!(live.company, "ACME");
        assert_eq!(live.state, POWER_RUNNING);
        assert_eq!(live.network, "DMZ");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(ServerKey::new("web01", "hv-a").to_string(), "web01@hv-a");
    }
}
