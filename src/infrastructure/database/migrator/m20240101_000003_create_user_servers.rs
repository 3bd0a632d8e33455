//! Create user_servers (ownership) table migration

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users::Users;
use super::m20240101_000002_create_servers::Servers;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserServers::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(UserServers::UserId).string().not_null())
                    .col(ColumnDef::new(UserServers::ServerId).integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(UserServers::UserId)
                            .col(UserServers::ServerId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_servers_user_id")
                            .from(UserServers::Table, UserServers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_servers_server_id")
                            .from(UserServers::Table, UserServers::ServerId)
                            .to(Servers::Table, Servers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserServers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum UserServers {
    Table,
    UserId,
    ServerId,
}
