use std::collections::BTreeSet;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::sea_query::JoinType;

use crate::domain::{DomainError, DomainResult, Server, ServerRepository};
use crate::infrastructure::database::entities::{server, user, user_server};

use super::db_err;

pub struct SeaOrmServerRepository {
    db: DatabaseConnection,
}

impl SeaOrmServerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn server_model_to_domain(model: server::Model) -> Server {
    Server {
        id: model.id,
        vm_id: model.vm_id,
        name: model.name,
        hv: model.hv,
        ip: model.ip,
        out_addr: model.out_addr,
        company: model.company,
        description: model.description,
        state: model.state,
        network: model.network,
    }
}

#[async_trait]
impl ServerRepository for SeaOrmServerRepository {
    async fn get_server(&self, id: i64) -> DomainResult<Server> {
        server::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(server_model_to_domain)
            .ok_or_else(|| DomainError::not_found("Server", "id", id))
    }

    async fn list_servers(&self) -> DomainResult<Vec<Server>> {
        let models = server::Entity::find()
            .order_by_asc(server::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(server_model_to_domain).collect())
    }

    async fn list_servers_for_user(&self, user_id: &str) -> DomainResult<Vec<Server>> {
        let models = server::Entity::find()
            .join(JoinType::InnerJoin, server::Relation::UserServers.def())
            .filter(user_server::Column::UserId.eq(user_id))
            .order_by_asc(server::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(server_model_to_domain).collect())
    }

    /// Insert unknown machines; for known ones refresh only the host-reported
    /// fields so operator-entered metadata survives a sync.
    async fn upsert_servers(&self, servers: &[Server]) -> DomainResult<usize> {
        let txn = self.db.begin().await.map_err(db_err)?;

        for s in servers {
            let existing = server::Entity::find()
                .filter(server::Column::Name.eq(s.name.as_str()))
                .filter(server::Column::Hv.eq(s.hv.as_str()))
                .one(&txn)
                .await
                .map_err(db_err)?;

            match existing {
                Some(model) => {
                    let mut active: server::ActiveModel = model.into();
                    active.vm_id = Set(s.vm_id.clone());
                    active.state = Set(s.state.clone());
                    active.network = Set(s.network.clone());
                    active.update(&txn).await.map_err(db_err)?;
                }
                None => {
                    server::ActiveModel {
                        id: NotSet,
                        vm_id: Set(s.vm_id.clone()),
                        name: Set(s.name.clone()),
                        hv: Set(s.hv.clone()),
                        ip: Set(s.ip.clone()),
                        out_addr: Set(s.out_addr.clone()),
                        company: Set(s.company.clone()),
                        description: Set(s.description.clone()),
                        state: Set(s.state.clone()),
                        network: Set(s.network.clone()),
                    }
                    .insert(&txn)
                    .await
                    .map_err(db_err)?;
                }
            }
        }

        txn.commit().await.map_err(db_err)?;
        Ok(servers.len())
    }

    async fn set_user_servers(&self, user_id: &str, server_ids: &[i64]) -> DomainResult<()> {
        let ids: BTreeSet<i64> = server_ids.iter().copied().collect();
        let txn = self.db.begin().await.map_err(db_err)?;

        if user::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_none()
        {
            return Err(DomainError::not_found("User", "id", user_id));
        }

        if !ids.is_empty() {
            let found = server::Entity::find()
                .filter(server::Column::Id.is_in(ids.iter().copied()))
                .count(&txn)
                .await
                .map_err(db_err)?;
            if found != ids.len() as u64 {
                let known: BTreeSet<i64> = server::Entity::find()
                    .filter(server::Column::Id.is_in(ids.iter().copied()))
                    .all(&txn)
                    .await
                    .map_err(db_err)?
                    .into_iter()
                    .map(|m| m.id)
                    .collect();
                let missing = ids.difference(&known).next().copied().unwrap_or_default();
                return Err(DomainError::not_found("Server", "id", missing));
            }
        }

        user_server::Entity::delete_many()
            .filter(user_server::Column::UserId.eq(user_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if !ids.is_empty() {
            user_server::Entity::insert_many(ids.iter().map(|id| user_server::ActiveModel {
                user_id: Set(user_id.to_string()),
                server_id: Set(*id),
            }))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)
    }
}
