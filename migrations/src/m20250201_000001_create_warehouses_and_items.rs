use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Warehouses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Warehouses::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Warehouses::Name).string().not_null())
                    .col(
                        ColumnDef::new(Warehouses::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Warehouses::Address).string().null())
                    .col(ColumnDef::new(Warehouses::City).string().null())
                    .col(ColumnDef::new(Warehouses::State).string().null())
                    .col(ColumnDef::new(Warehouses::Country).string().null())
                    .col(ColumnDef::new(Warehouses::PostalCode).string().null())
                    .col(
                        ColumnDef::new(Warehouses::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Warehouses::Priority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Warehouses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Warehouses::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Quantity columns carry the non-negativity contract at the storage level
        manager
            .create_table(
                Table::create()
                    .table(InventoryItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(InventoryItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(InventoryItems::VariantId).uuid().null())
                    .col(
                        ColumnDef::new(InventoryItems::Sku)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::TotalQuantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryItems::TotalQuantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::AvailableQuantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryItems::AvailableQuantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::ReservedQuantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryItems::ReservedQuantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::ReorderPoint)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::ReorderQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_items_product_id")
                    .table(InventoryItems::Table)
                    .col(InventoryItems::ProductId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Warehouses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Warehouses {
    Table,
    Id,
    Name,
    Code,
    Address,
    City,
    State,
    Country,
    PostalCode,
    IsActive,
    Priority,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(crate) enum InventoryItems {
    Table,
    Id,
    ProductId,
    VariantId,
    Sku,
    TotalQuantity,
    AvailableQuantity,
    ReservedQuantity,
    ReorderPoint,
    ReorderQuantity,
    Status,
    LastUpdated,
    CreatedAt,
    UpdatedAt,
}
