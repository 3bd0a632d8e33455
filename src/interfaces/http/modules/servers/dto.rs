//! Server DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Server;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServerDto {
    /// Store id, `0` for machines reported by a host but never synced
    pub id: i64,
    pub vm_id: String,
    pub name: String,
    pub hv: String,
    pub ip: String,
    pub out_addr: String,
    pub company: String,
    pub description: String,
    /// Live power state, e.g. `Running` or `Off`
    pub state: String,
    /// Connected switch, empty when disconnected
    pub network: String,
}

impl From<Server> for ServerDto {
    fn from(s: Server) -> Self {
        Self {
            id: s.id,
            vm_id: s.vm_id,
            name: s.name,
            hv: s.hv,
            ip: s.ip,
            out_addr: s.out_addr,
            company: s.company,
            description: s.description,
            state: s.state,
            network: s.network,
        }
    }
}

/// Body of `POST /api/v1/servers/control`.
///
/// Missing fields default to empty so the gate can answer with a
/// validation error instead of a deserialization failure.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ControlRequest {
    #[serde(default)]
    pub server_id: i64,
    /// One of `start_power`, `stop_power`, `stop_power_force`,
    /// `start_network`, `stop_network`
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ControlResponse {
    pub server_id: i64,
    pub name: String,
    pub hv: String,
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    /// Machines written to the store
    pub synced: usize,
}
