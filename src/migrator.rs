use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_core_tables::Migration),
            Box::new(m20240301_000002_create_association_tables::Migration),
            Box::new(m20240301_000003_add_foreign_key_indexes::Migration),
        ]
    }
}

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    Name,
    Surname,
    Email,
    Contact,
    Address,
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    OpenedAt,
    ClientId,
}

#[derive(DeriveIden)]
enum Technicians {
    Table,
    Id,
    Name,
    Surname,
    Specialty,
}

#[derive(DeriveIden)]
enum Articles {
    Table,
    Id,
    Name,
    Description,
    Price,
    InStock,
}

#[derive(DeriveIden)]
enum Maintenance {
    Table,
    Id,
    Kind,
    Description,
    OpenedAt,
    ClosedAt,
    Price,
    OrderId,
}

#[derive(DeriveIden)]
enum Sales {
    Table,
    Id,
    SoldAt,
    OrderId,
}

#[derive(DeriveIden)]
enum MaintenanceTechnicians {
    Table,
    MaintenanceId,
    TechnicianId,
}

#[derive(DeriveIden)]
enum SaleArticles {
    Table,
    SaleId,
    ArticleId,
    Quantity,
    RecordedPrice,
}

mod m20240301_000001_create_core_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_core_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Clients::Id)
                                .big_integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Clients::Name).string().not_null())
                        .col(ColumnDef::new(Clients::Surname).string().not_null())
                        .col(ColumnDef::new(Clients::Email).string().null().unique_key())
                        .col(ColumnDef::new(Clients::Contact).big_integer().null())
                        .col(ColumnDef::new(Clients::Address).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Orders::OpenedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::ClientId).big_integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_client_id")
                                .from(Orders::Table, Orders::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Technicians::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Technicians::Id)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Technicians::Name).string().not_null())
                        .col(ColumnDef::new(Technicians::Surname).string().not_null())
                        .col(ColumnDef::new(Technicians::Specialty).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Articles::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Articles::Id)
                                .integer()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Articles::Name).string().not_null())
                        .col(ColumnDef::new(Articles::Description).string().null())
                        .col(ColumnDef::new(Articles::Price).double().not_null())
                        .col(
                            ColumnDef::new(Articles::InStock)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Maintenance::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Maintenance::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Maintenance::Kind).string_len(16).not_null())
                        .col(ColumnDef::new(Maintenance::Description).string().not_null())
                        .col(
                            ColumnDef::new(Maintenance::OpenedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Maintenance::ClosedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Maintenance::Price).double().not_null())
                        .col(ColumnDef::new(Maintenance::OrderId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_order_id")
                                .from(Maintenance::Table, Maintenance::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sales::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sales::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Sales::SoldAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Sales::OrderId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sales_order_id")
                                .from(Sales::Table, Sales::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Sales::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Maintenance::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Articles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Technicians::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000002_create_association_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_association_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // The composite primary keys are the storage-level uniqueness guard.
            manager
                .create_table(
                    Table::create()
                        .table(MaintenanceTechnicians::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::MaintenanceId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaintenanceTechnicians::TechnicianId)
                                .integer()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(MaintenanceTechnicians::MaintenanceId)
                                .col(MaintenanceTechnicians::TechnicianId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_technicians_maintenance_id")
                                .from(
                                    MaintenanceTechnicians::Table,
                                    MaintenanceTechnicians::MaintenanceId,
                                )
                                .to(Maintenance::Table, Maintenance::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_maintenance_technicians_technician_id")
                                .from(
                                    MaintenanceTechnicians::Table,
                                    MaintenanceTechnicians::TechnicianId,
                                )
                                .to(Technicians::Table, Technicians::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SaleArticles::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(SaleArticles::SaleId).integer().not_null())
                        .col(ColumnDef::new(SaleArticles::ArticleId).integer().not_null())
                        .col(ColumnDef::new(SaleArticles::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(SaleArticles::RecordedPrice)
                                .double()
                                .not_null(),
                        )
                        .primary_key(
                            Index::create()
                                .col(SaleArticles::SaleId)
                                .col(SaleArticles::ArticleId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_articles_sale_id")
                                .from(SaleArticles::Table, SaleArticles::SaleId)
                                .to(Sales::Table, Sales::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sale_articles_article_id")
                                .from(SaleArticles::Table, SaleArticles::ArticleId)
                                .to(Articles::Table, Articles::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SaleArticles::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MaintenanceTechnicians::Table).to_owned())
                .await
        }
    }
}

mod m20240301_000003_add_foreign_key_indexes {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_add_foreign_key_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_client_id")
                        .table(Orders::Table)
                        .col(Orders::ClientId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_maintenance_order_id")
                        .table(Maintenance::Table)
                        .col(Maintenance::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sales_order_id")
                        .table(Sales::Table)
                        .col(Sales::OrderId)
                        .to_owned(),
                )
                .await?;

            // Lookups from the child side of each association.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_maintenance_technicians_technician_id")
                        .table(MaintenanceTechnicians::Table)
                        .col(MaintenanceTechnicians::TechnicianId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_sale_articles_article_id")
                        .table(SaleArticles::Table)
                        .col(SaleArticles::ArticleId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_sale_articles_article_id")
                        .table(SaleArticles::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_maintenance_technicians_technician_id")
                        .table(MaintenanceTechnicians::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_sales_order_id")
                        .table(Sales::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_maintenance_order_id")
                        .table(Maintenance::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_index(
                    Index::drop()
                        .name("idx_orders_client_id")
                        .table(Orders::Table)
                        .to_owned(),
                )
                .await
        }
    }
}
