//! Location ledger primitives.
//!
//! Every quantity change in the engine goes through [`apply_to_item`] and,
//! when a warehouse is involved, [`apply_to_location`]. Both issue a single
//! conditional `UPDATE` whose `WHERE` clause refuses to drive any quantity
//! below zero, and both must be called on the same [`DatabaseTransaction`]
//! so the item and location halves commit or roll back together. Callers
//! always mutate the item row before the location row to keep lock order
//! stable across concurrent transactions.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::entities::inventory_item::{self, Entity as InventoryItemEntity, InventoryStatus};
use crate::entities::inventory_location::{self, Entity as InventoryLocationEntity};
use crate::entities::inventory_transaction::{self, TransactionType};
use crate::entities::warehouse::{self, Entity as WarehouseEntity};
use crate::errors::ServiceError;

/// Signed change applied to a `(total, available, reserved)` triple.
///
/// Every constructor keeps `total == available + reserved` invariant by
/// construction: `total` always equals `available + reserved` of the delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityDelta {
    pub total: i32,
    pub available: i32,
    pub reserved: i32,
}

impl QuantityDelta {
    /// New physical stock arriving.
    pub fn stock_in(quantity: i32) -> Self {
        Self {
            total: quantity,
            available: quantity,
            reserved: 0,
        }
    }

    /// Physical stock leaving from the available pool.
    pub fn stock_out(quantity: i32) -> Self {
        Self {
            total: -quantity,
            available: -quantity,
            reserved: 0,
        }
    }

    /// Available stock placed on hold.
    pub fn reserve(quantity: i32) -> Self {
        Self {
            total: 0,
            available: -quantity,
            reserved: quantity,
        }
    }

    /// Held stock returned to the available pool.
    pub fn release(quantity: i32) -> Self {
        Self {
            total: 0,
            available: quantity,
            reserved: -quantity,
        }
    }

    /// Held stock leaving the building.
    pub fn consume(quantity: i32) -> Self {
        Self {
            total: -quantity,
            available: 0,
            reserved: -quantity,
        }
    }

    pub fn is_balanced(&self) -> bool {
        self.total == self.available + self.reserved
    }
}

/// Result of an item mutation.
#[derive(Debug, Clone)]
pub struct ItemMutation {
    pub item: inventory_item::Model,
    /// Set when the derived status moved as a result of this mutation.
    pub previous_status: Option<InventoryStatus>,
}

impl ItemMutation {
    /// True when this mutation pushed the item to or below its reorder point.
    pub fn crossed_into_low_stock(&self) -> bool {
        matches!(self.previous_status, Some(InventoryStatus::InStock))
            && self.item.status != InventoryStatus::InStock
    }
}

/// Applies `delta` to the item row, failing without side effects when a
/// decrement would leave any quantity negative. Recomputes the derived status.
pub async fn apply_to_item(
    txn: &DatabaseTransaction,
    item_id: Uuid,
    delta: QuantityDelta,
) -> Result<ItemMutation, ServiceError> {
    debug_assert!(delta.is_balanced());
    let now = Utc::now();

    let mut update = InventoryItemEntity::update_many()
        .col_expr(inventory_item::Column::LastUpdated, Expr::value(now))
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_item::Column::Id.eq(item_id));

    for (column, change) in [
        (inventory_item::Column::TotalQuantity, delta.total),
        (inventory_item::Column::AvailableQuantity, delta.available),
        (inventory_item::Column::ReservedQuantity, delta.reserved),
    ] {
        if change == 0 {
            continue;
        }
        update = update.col_expr(column, Expr::col(column).add(change));
        if change < 0 {
            update = update.filter(column.gte(-change));
        }
    }

    let result = update.exec(txn).await.map_err(ServiceError::db_error)?;

    if result.rows_affected == 0 {
        let current = InventoryItemEntity::find_by_id(item_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?;
        return Err(match current {
            None => ServiceError::NotFound(format!("Inventory item {} not found", item_id)),
            Some(item) => ServiceError::InsufficientInventory(format!(
                "Item {} ({}) has {} available and {} reserved; cannot apply {:?}",
                item.id, item.sku, item.available_quantity, item.reserved_quantity, delta
            )),
        });
    }

    let item = InventoryItemEntity::find_by_id(item_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", item_id)))?;

    let status = InventoryStatus::determine(item.available_quantity, item.reorder_point);
    if status == item.status {
        return Ok(ItemMutation {
            item,
            previous_status: None,
        });
    }

    let previous = item.status;
    let mut active: inventory_item::ActiveModel = item.into();
    active.status = Set(status);
    let item = active.update(txn).await.map_err(ServiceError::db_error)?;

    debug!(item_id = %item.id, from = %previous, to = %status, "Inventory status changed");

    Ok(ItemMutation {
        item,
        previous_status: Some(previous),
    })
}

/// Creates an empty location row for `(item, warehouse)` unless one exists.
/// Safe against concurrent first allocations to the same pair.
pub async fn ensure_location<C>(conn: &C, item_id: Uuid, warehouse_id: Uuid) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let location = inventory_location::ActiveModel {
        id: Set(Uuid::new_v4()),
        inventory_item_id: Set(item_id),
        warehouse_id: Set(warehouse_id),
        quantity: Set(0),
        available_quantity: Set(0),
        reserved_quantity: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };

    InventoryLocationEntity::insert(location)
        .on_conflict(
            OnConflict::columns([
                inventory_location::Column::InventoryItemId,
                inventory_location::Column::WarehouseId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok(())
}

/// Applies `delta` to the `(item, warehouse)` location row. A missing row is
/// treated as holding nothing.
pub async fn apply_to_location(
    txn: &DatabaseTransaction,
    item_id: Uuid,
    warehouse_id: Uuid,
    delta: QuantityDelta,
) -> Result<inventory_location::Model, ServiceError> {
    debug_assert!(delta.is_balanced());
    let now = Utc::now();

    let mut update = InventoryLocationEntity::update_many()
        .col_expr(inventory_location::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_location::Column::InventoryItemId.eq(item_id))
        .filter(inventory_location::Column::WarehouseId.eq(warehouse_id));

    for (column, change) in [
        (inventory_location::Column::Quantity, delta.total),
        (inventory_location::Column::AvailableQuantity, delta.available),
        (inventory_location::Column::ReservedQuantity, delta.reserved),
    ] {
        if change == 0 {
            continue;
        }
        update = update.col_expr(column, Expr::col(column).add(change));
        if change < 0 {
            update = update.filter(column.gte(-change));
        }
    }

    let result = update.exec(txn).await.map_err(ServiceError::db_error)?;

    let location = find_location(txn, item_id, warehouse_id).await?;

    if result.rows_affected == 0 {
        return Err(match location {
            None => ServiceError::InsufficientInventory(format!(
                "Warehouse {} holds no stock of item {}",
                warehouse_id, item_id
            )),
            Some(location) => ServiceError::InsufficientInventory(format!(
                "Warehouse {} has {} available and {} reserved of item {}; cannot apply {:?}",
                warehouse_id,
                location.available_quantity,
                location.reserved_quantity,
                item_id,
                delta
            )),
        });
    }

    location.ok_or_else(|| {
        ServiceError::db_error(format!(
            "location row for item {} in warehouse {} vanished mid-transaction",
            item_id, warehouse_id
        ))
    })
}

pub async fn find_location<C>(
    conn: &C,
    item_id: Uuid,
    warehouse_id: Uuid,
) -> Result<Option<inventory_location::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    InventoryLocationEntity::find()
        .filter(inventory_location::Column::InventoryItemId.eq(item_id))
        .filter(inventory_location::Column::WarehouseId.eq(warehouse_id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Locations of `item_id` in active warehouses with at least `quantity`
/// available, best candidate first: higher warehouse priority, then lower
/// warehouse code.
pub async fn covering_locations<C>(
    conn: &C,
    item_id: Uuid,
    quantity: i32,
) -> Result<Vec<inventory_location::Model>, ServiceError>
where
    C: ConnectionTrait,
{
    let locations = InventoryLocationEntity::find()
        .filter(inventory_location::Column::InventoryItemId.eq(item_id))
        .filter(inventory_location::Column::AvailableQuantity.gte(quantity))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if locations.is_empty() {
        return Ok(locations);
    }

    let warehouses: HashMap<Uuid, warehouse::Model> = WarehouseEntity::find()
        .filter(warehouse::Column::Id.is_in(locations.iter().map(|l| l.warehouse_id)))
        .filter(warehouse::Column::IsActive.eq(true))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|w| (w.id, w))
        .collect();

    let mut ranked: Vec<(&warehouse::Model, inventory_location::Model)> = locations
        .into_iter()
        .filter_map(|l| warehouses.get(&l.warehouse_id).map(|w| (w, l)))
        .collect();
    ranked.sort_by(|(a, _), (b, _)| b.priority.cmp(&a.priority).then_with(|| a.code.cmp(&b.code)));

    Ok(ranked.into_iter().map(|(_, location)| location).collect())
}

/// True when any warehouse holds a location row for the item.
pub async fn has_locations<C>(conn: &C, item_id: Uuid) -> Result<bool, ServiceError>
where
    C: ConnectionTrait,
{
    let count = InventoryLocationEntity::find()
        .filter(inventory_location::Column::InventoryItemId.eq(item_id))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(count > 0)
}

/// Audit record to append.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub inventory_item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

impl AuditEntry {
    pub fn new(
        inventory_item_id: Uuid,
        warehouse_id: Option<Uuid>,
        transaction_type: TransactionType,
        quantity: i32,
    ) -> Self {
        Self {
            inventory_item_id,
            warehouse_id,
            transaction_type,
            quantity,
            reference_id: None,
            reference_type: None,
            notes: None,
            created_by: None,
        }
    }

    pub fn with_reference(mut self, reference_id: Option<String>, reference_type: Option<String>) -> Self {
        self.reference_id = reference_id;
        self.reference_type = reference_type;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_created_by(mut self, created_by: Option<String>) -> Self {
        self.created_by = created_by;
        self
    }
}

/// Appends an audit record inside a savepoint. A failed write is logged and
/// rolled back to the savepoint; the enclosing transaction carries on.
pub async fn record_transaction(txn: &DatabaseTransaction, entry: AuditEntry) {
    let savepoint = match txn.begin().await {
        Ok(savepoint) => savepoint,
        Err(e) => {
            warn!(
                inventory_item_id = %entry.inventory_item_id,
                transaction_type = %entry.transaction_type,
                error = %e,
                "Could not open savepoint for inventory audit record"
            );
            return;
        }
    };

    let record = inventory_transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        inventory_item_id: Set(entry.inventory_item_id),
        warehouse_id: Set(entry.warehouse_id),
        transaction_type: Set(entry.transaction_type),
        quantity: Set(entry.quantity),
        reference_id: Set(entry.reference_id.clone()),
        reference_type: Set(entry.reference_type.clone()),
        notes: Set(entry.notes.clone()),
        created_by: Set(entry.created_by.clone()),
        created_at: Set(Utc::now()),
    };

    match record.insert(&savepoint).await {
        Ok(_) => {
            if let Err(e) = savepoint.commit().await {
                warn!(
                    inventory_item_id = %entry.inventory_item_id,
                    error = %e,
                    "Failed to release savepoint for inventory audit record"
                );
            }
        }
        Err(e) => {
            warn!(
                inventory_item_id = %entry.inventory_item_id,
                transaction_type = %entry.transaction_type,
                quantity = entry.quantity,
                error = %e,
                "Failed to write inventory audit record; continuing without it"
            );
            if let Err(e) = savepoint.rollback().await {
                warn!(error = %e, "Failed to roll back audit savepoint");
            }
        }
    }
}
