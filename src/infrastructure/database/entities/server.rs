//! Server (virtual machine) entity for database

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Stored machine metadata. `state`/`network` hold the last synced values;
/// live values come from the state cache.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "servers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub vm_id: String,
    pub name: String,
    pub hv: String,
    pub ip: String,
    pub out_addr: String,
    pub company: String,
    pub description: String,
    pub state: String,
    pub network: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_server::Entity")]
    UserServers,
}

impl Related<super::user_server::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserServers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
