use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use crate::domain::{
    DomainError, DomainResult, RefreshTokenRepository, User, UserRepository, UserRole,
};
use crate::infrastructure::database::entities::{refresh_token, user, user_server};

use super::db_err;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn entity_role_to_domain(role: user::UserRole) -> UserRole {
    match role {
        user::UserRole::Admin => UserRole::Admin,
        user::UserRole::User => UserRole::User,
    }
}

fn domain_role_to_entity(role: UserRole) -> user::UserRole {
    match role {
        UserRole::Admin => user::UserRole::Admin,
        UserRole::User => user::UserRole::User,
    }
}

fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        company: model.company,
        role: entity_role_to_domain(model.role),
        password_hash: model.password_hash,
    }
}

// ── Repository implementation ───────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn create_user(&self, new: User) -> DomainResult<User> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(new.id.clone()),
            name: Set(new.name.clone()),
            email: Set(new.email.clone()),
            company: Set(new.company.clone()),
            role: Set(domain_role_to_entity(new.role)),
            password_hash: Set(new.password_hash.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model.insert(&self.db).await.map_err(|e| {
            if e.to_string().contains("UNIQUE") || e.to_string().contains("duplicate") {
                DomainError::Conflict(format!("user with email '{}' already exists", new.email))
            } else {
                db_err(e)
            }
        })?;

        Ok(new)
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<User> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(user_model_to_domain)
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<User> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(user_model_to_domain)
            .ok_or_else(|| DomainError::not_found("User", "email", email))
    }

    async fn list_users(&self) -> DomainResult<Vec<User>> {
        let models = user::Entity::find()
            .order_by_asc(user::Column::Email)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(user_model_to_domain).collect())
    }

    async fn update_user(
        &self,
        id: &str,
        name: &str,
        company: &str,
        role: UserRole,
        password_hash: Option<&str>,
    ) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("User", "id", id))?;

        let mut active: user::ActiveModel = existing.into();
        active.name = Set(name.to_string());
        active.company = Set(company.to_string());
        active.role = Set(domain_role_to_entity(role));
        if let Some(hash) = password_hash {
            active.password_hash = Set(hash.to_string());
        }
        active.updated_at = Set(Utc::now());

        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        user_server::Entity::delete_many()
            .filter(user_server::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        refresh_token::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let result = user::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("User", "id", id));
        }
        txn.commit().await.map_err(db_err)
    }
}

#[async_trait]
impl RefreshTokenRepository for SeaOrmUserRepository {
    async fn upsert_refresh_token(&self, user_id: &str, token: &str) -> DomainResult<()> {
        let model = refresh_token::ActiveModel {
            user_id: Set(user_id.to_string()),
            token: Set(token.to_string()),
            updated_at: Set(Utc::now()),
        };

        refresh_token::Entity::insert(model)
            .on_conflict(
                OnConflict::column(refresh_token::Column::UserId)
                    .update_columns([refresh_token::Column::Token, refresh_token::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_refresh_token(&self, user_id: &str) -> DomainResult<Option<String>> {
        let model = refresh_token::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.token))
    }

    async fn find_refresh_token_owner(&self, token: &str) -> DomainResult<Option<String>> {
        let model = refresh_token::Entity::find()
            .filter(refresh_token::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(|m| m.user_id))
    }
}
