//! Inventory service
//!
//! Rebuilds the state cache from the virtualization hosts and answers
//! "which machines can this user see" by joining live state with the
//! metadata kept in the store.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::application::cache::SharedStateCache;
use crate::domain::server::command::quote;
use crate::domain::{
    DomainError, DomainResult, HypervisorExecutor, Server, ServerRepository, User,
};

/// Where and how to query the hosts
#[derive(Debug, Clone)]
pub struct InventoryConfig {
    pub hosts: Vec<String>,
    pub script: String,
}

pub struct InventoryService {
    executor: Arc<dyn HypervisorExecutor>,
    cache: SharedStateCache,
    servers: Arc<dyn ServerRepository>,
    config: InventoryConfig,
}

impl InventoryService {
    pub fn new(
        executor: Arc<dyn HypervisorExecutor>,
        cache: SharedStateCache,
        servers: Arc<dyn ServerRepository>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            executor,
            cache,
            servers,
            config,
        }
    }

    /// `<script> -hvList 'hv1', 'hv2'`
    pub fn inventory_instruction(&self) -> String {
        if self.config.hosts.is_empty() {
            return self.config.script.clone();
        }
        let hosts: Vec<String> = self.config.hosts.iter().map(|h| quote(h)).collect();
        format!("{} -hvList {}", self.config.script, hosts.join(", "))
    }

    /// Query every host and replace the cache with the result.
    ///
    /// On any failure the previous snapshot stays in place.
    pub async fn refresh_cache(&self) -> DomainResult<usize> {
        let output = self.executor.run(&self.inventory_instruction()).await?;
        let servers = parse_inventory(&output)?;
        let count = servers.len();
        self.cache.replace(servers);
        info!(count, hosts = self.config.hosts.len(), "🔄 Server state refreshed");
        Ok(count)
    }

    /// Machines visible to `user` with their live state.
    ///
    /// Admins see everything the hosts report, enriched with stored metadata.
    /// Other users see their assigned machines with live state overlaid.
    pub async fn servers_for(&self, user: &User) -> DomainResult<Vec<Server>> {
        if user.is_admin() {
            let live = self.live_snapshot().await?;
            let stored = self.servers.list_servers().await?;
            return Ok(live
                .iter()
                .map(|server| {
                    let mut server = server.clone();
                    if let Some(meta) = stored.iter().find(|s| same_machine(s, &server)) {
                        server.merge_metadata(meta);
                    }
                    server
                })
                .collect());
        }

        let mut owned = self.servers.list_servers_for_user(&user.id).await?;
        if let Some(live) = self.cache.snapshot() {
            for server in owned.iter_mut() {
                let key = server.key();
                if let Some(current) = live.iter().find(|s| s.matches(&key)) {
                    server.state = current.state.clone();
                    server.network = current.network.clone();
                }
            }
        }
        Ok(owned)
    }

    /// Refresh from the hosts and record every machine in the store.
    pub async fn sync_store(&self) -> DomainResult<usize> {
        self.refresh_cache().await?;
        let live = self.cache.snapshot().unwrap_or_default();
        let count = self.servers.upsert_servers(&live).await?;
        info!(count, "Inventory synced to store");
        Ok(count)
    }

    async fn live_snapshot(&self) -> DomainResult<Arc<Vec<Server>>> {
        if let Some(snapshot) = self.cache.snapshot() {
            return Ok(snapshot);
        }
        debug!("State cache unpopulated, refreshing on demand");
        self.refresh_cache().await?;
        Ok(self.cache.snapshot().unwrap_or_default())
    }
}

fn same_machine(stored: &Server, live: &Server) -> bool {
    if stored.hv != live.hv {
        return false;
    }
    (!live.vm_id.is_empty() && stored.vm_id == live.vm_id) || stored.name == live.name
}

/// One machine as printed by the inventory script
#[derive(Debug, Deserialize)]
struct VmRecord {
    #[serde(alias = "Id", alias = "ID", deserialize_with = "lenient_string", default)]
    id: String,
    #[serde(alias = "Name")]
    name: String,
    #[serde(alias = "State", deserialize_with = "lenient_string", default)]
    state: String,
    #[serde(alias = "Network", deserialize_with = "lenient_string", default)]
    network: String,
    #[serde(alias = "HV", default)]
    hv: String,
}

/// `ConvertTo-Json` prints a bare object when there is exactly one element.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<VmRecord>),
    One(VmRecord),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Parse inventory output into servers, dropping repeated (name, hv) keys.
pub fn parse_inventory(output: &[u8]) -> DomainResult<Vec<Server>> {
    let text = String::from_utf8_lossy(output);
    let text = text.trim_start_matches('\u{feff}').trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    let records = match serde_json::from_str::<OneOrMany>(text) {
        Ok(OneOrMany::Many(records)) => records,
        Ok(OneOrMany::One(record)) => vec![record],
        Err(e) => {
            return Err(DomainError::Upstream(format!(
                "unparsable inventory output: {}",
                e
            )))
        }
    };

    let mut seen = HashSet::new();
    let mut servers = Vec::with_capacity(records.len());
    for record in records {
        let server = Server {
            vm_id: record.id,
            name: record.name,
            hv: record.hv,
            state: record.state,
            network: record.network,
            ..Default::default()
        };
        if seen.insert(server.key()) {
            servers.push(server);
        } else {
            debug!(server = %server.key(), "Duplicate inventory record dropped");
        }
    }
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::cache::StateCache;
    use crate::application::testing::FakeExecutor;
    use crate::domain::{UserRepository, UserRole, POWER_OFF};
    use crate::infrastructure::storage::InMemoryStore;

    const THREE: &str = r#"[
        {"id": "a1", "name": "web01", "state": "Running", "network": "DMZ", "HV": "hv-a"},
        {"id": "a2", "name": "web02", "state": "Off", "network": "", "HV": "hv-a"},
        {"id": "b1", "name": "db01", "state": "Running", "network": "DMZ", "HV": "hv-b"}
    ]"#;

    fn service(executor: FakeExecutor) -> (InventoryService, SharedStateCache, Arc<InMemoryStore>) {
        let cache = StateCache::shared();
        let store = Arc::new(InMemoryStore::new());
        let svc = InventoryService::new(
            Arc::new(executor),
            cache.clone(),
            store.clone(),
            InventoryConfig {
                hosts: vec!["hv-a".into(), "hv-b".into()],
                script: "./GetVm.ps1".into(),
            },
        );
        (svc, cache, store)
    }

    #[test]
    fn test_parse_single_object() {
        let servers =
            parse_inventory(br#"{"Id": "x", "Name": "solo", "State": 2, "HV": "hv-a"}"#).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "solo");
        assert_eq!(servers[0].state, "2");
        assert_eq!(servers[0].network, "");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_inventory(b"  \r\n").unwrap().is_empty());
        assert!(parse_inventory(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_drops_duplicate_keys() {
        let servers = parse_inventory(
            br#"[
                {"id": "1", "name": "web01", "state": "Running", "HV": "hv-a"},
                {"id": "2", "name": "web01", "state": "Off", "HV": "hv-a"},
                {"id": "3", "name": "web01", "state": "Off", "HV": "hv-b"}
            ]"#,
        )
        .unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].vm_id, "1");
        assert_eq!(servers[1].hv, "hv-b");
    }

    #[test]
    fn test_parse_garbage_is_upstream_error() {
        let err = parse_inventory(b"Get-VM : access denied").unwrap_err();
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn test_instruction_quotes_hosts() {
        let (svc, _, _) = service(FakeExecutor::ok(""));
        assert_eq!(svc.inventory_instruction(), "./GetVm.ps1 -hvList 'hv-a', 'hv-b'");
    }

    #[tokio::test]
    async fn test_refresh_populates_cache() {
        let (svc, cache, _) = service(FakeExecutor::ok(THREE));
        assert_eq!(svc.refresh_cache().await.unwrap(), 3);
        assert_eq!(cache.snapshot().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (svc, cache, _) = service(FakeExecutor::failing("host down"));
        cache.replace(vec![Server {
            name: "old".into(),
            hv: "hv-a".into(),
            ..Default::default()
        }]);

        assert!(svc.refresh_cache().await.is_err());
        assert_eq!(cache.snapshot().unwrap()[0].name, "old");
    }

    #[tokio::test]
    async fn test_admin_listing_refreshes_on_demand_and_merges_metadata() {
        let (svc, cache, store) = service(FakeExecutor::ok(THREE));
        store
            .upsert_servers(&[Server {
                vm_id: "a2".into(),
                name: "web02".into(),
                hv: "hv-a".into(),
                ip: "10.0.0.2".into(),
                company: "ACME".into(),
                ..Default::default()
            }])
            .await
            .unwrap();
        let admin = User {
            id: "admin".into(),
            role: UserRole::Admin,
            ..Default::default()
        };

        assert!(!cache.is_populated());
        let servers = svc.servers_for(&admin).await.unwrap();

        assert_eq!(servers.len(), 3);
        assert_eq!(servers[1].id, 1);
        assert_eq!(servers[1].ip, "10.0.0.2");
        assert_eq!(servers[1].state, POWER_OFF);
        assert_eq!(servers[0].id, 0);
    }

    #[tokio::test]
    async fn test_user_listing_overlays_live_state() {
        let (svc, _, store) = service(FakeExecutor::ok(THREE));
        store
            .create_user(User {
                id: "u-1".into(),
                email: "u@x.io".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .upsert_servers(&[
                Server {
                    name: "db01".into(),
                    hv: "hv-b".into(),
                    state: "Unknown".into(),
                    ..Default::default()
                },
                Server {
                    name: "web01".into(),
                    hv: "hv-a".into(),
                    ..Default::default()
                },
            ])
            .await
            .unwrap();
        store.set_user_servers("u-1", &[1]).await.unwrap();
        let user = User {
            id: "u-1".into(),
            ..Default::default()
        };

        let before = svc.servers_for(&user).await.unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].state, "Unknown");

        svc.refresh_cache().await.unwrap();
        let after = svc.servers_for(&user).await.unwrap();
        assert_eq!(after[0].name, "db01");
        assert_eq!(after[0].state, "Running");
        assert_eq!(after[0].network, "DMZ");
    }

    #[tokio::test]
    async fn test_sync_store_upserts_inventory() {
        let (svc, _, store) = service(FakeExecutor::ok(THREE));
        assert_eq!(svc.sync_store().await.unwrap(), 3);
        assert_eq!(svc.sync_store().await.unwrap(), 3);
        assert_eq!(store.list_servers().await.unwrap().len(), 3);
    }
}
