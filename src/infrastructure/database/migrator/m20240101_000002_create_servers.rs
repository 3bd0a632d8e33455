//! Create servers table migration

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Servers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Servers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Servers::VmId).string().not_null().default(""))
                    .col(ColumnDef::new(Servers::Name).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::Hv).string_len(255).not_null())
                    .col(ColumnDef::new(Servers::Ip).string().not_null().default(""))
                    .col(ColumnDef::new(Servers::OutAddr).string().not_null().default(""))
                    .col(ColumnDef::new(Servers::Company).string().not_null().default(""))
                    .col(ColumnDef::new(Servers::Description).text().not_null().default(""))
                    .col(ColumnDef::new(Servers::State).string().not_null().default(""))
                    .col(ColumnDef::new(Servers::Network).string().not_null().default(""))
                    .to_owned(),
            )
            .await?;

        // One row per machine per host
        manager
            .create_index(
                Index::create()
                    .name("idx_servers_name_hv")
                    .table(Servers::Table)
                    .col(Servers::Name)
                    .col(Servers::Hv)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Servers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Servers {
    Table,
    Id,
    VmId,
    Name,
    Hv,
    Ip,
    OutAddr,
    Company,
    Description,
    State,
    Network,
}
