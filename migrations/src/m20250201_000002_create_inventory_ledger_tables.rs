use sea_orm_migration::prelude::*;

use crate::m20250201_000001_create_warehouses_and_items::{InventoryItems, Warehouses};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Per-warehouse split of an item's quantities
        manager
            .create_table(
                Table::create()
                    .table(InventoryLocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryLocations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::InventoryItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::WarehouseId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::Quantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryLocations::Quantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::AvailableQuantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryLocations::AvailableQuantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::ReservedQuantity)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(InventoryLocations::ReservedQuantity).gte(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryLocations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_locations_item")
                            .from(InventoryLocations::Table, InventoryLocations::InventoryItemId)
                            .to(InventoryItems::Table, InventoryItems::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_locations_warehouse")
                            .from(InventoryLocations::Table, InventoryLocations::WarehouseId)
                            .to(Warehouses::Table, Warehouses::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_locations_item_warehouse")
                    .table(InventoryLocations::Table)
                    .col(InventoryLocations::InventoryItemId)
                    .col(InventoryLocations::WarehouseId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Append-only audit trail
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::InventoryItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::WarehouseId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReferenceId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::ReferenceType)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::Notes).text().null())
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedBy)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_transactions_item")
                            .from(
                                InventoryTransactions::Table,
                                InventoryTransactions::InventoryItemId,
                            )
                            .to(InventoryItems::Table, InventoryItems::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_transactions_warehouse")
                            .from(
                                InventoryTransactions::Table,
                                InventoryTransactions::WarehouseId,
                            )
                            .to(Warehouses::Table, Warehouses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_transactions_item")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::InventoryItemId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(InventoryReservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryReservations::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::InventoryItemId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::WarehouseId)
                            .uuid()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::Quantity)
                            .integer()
                            .not_null()
                            .check(Expr::col(InventoryReservations::Quantity).gt(0)),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::Status)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::ExpirationTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::ReferenceId)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::ReferenceType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryReservations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_reservations_item")
                            .from(
                                InventoryReservations::Table,
                                InventoryReservations::InventoryItemId,
                            )
                            .to(InventoryItems::Table, InventoryItems::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_reservations_warehouse")
                            .from(
                                InventoryReservations::Table,
                                InventoryReservations::WarehouseId,
                            )
                            .to(Warehouses::Table, Warehouses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // The reaper scans pending rows by expiration time
        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_reservations_status_expiration")
                    .table(InventoryReservations::Table)
                    .col(InventoryReservations::Status)
                    .col(InventoryReservations::ExpirationTime)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inventory_reservations_reference")
                    .table(InventoryReservations::Table)
                    .col(InventoryReservations::ReferenceType)
                    .col(InventoryReservations::ReferenceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InventoryReservations::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InventoryTransactions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(InventoryLocations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryLocations {
    Table,
    Id,
    InventoryItemId,
    WarehouseId,
    Quantity,
    AvailableQuantity,
    ReservedQuantity,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum InventoryTransactions {
    Table,
    Id,
    InventoryItemId,
    WarehouseId,
    TransactionType,
    Quantity,
    ReferenceId,
    ReferenceType,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InventoryReservations {
    Table,
    Id,
    InventoryItemId,
    WarehouseId,
    Quantity,
    Status,
    ExpirationTime,
    ReferenceId,
    ReferenceType,
    CreatedAt,
    UpdatedAt,
}
