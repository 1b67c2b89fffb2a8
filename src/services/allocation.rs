//! Warehouse allocation: moving physical stock into and out of warehouses.

use metrics::counter;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::inventory_items::low_stock_event;
use super::ledger::{self, AuditEntry, ItemMutation, QuantityDelta};
use super::validate_pagination;
use super::warehouses::{fetch_active_warehouse, fetch_warehouse};
use crate::context::CallContext;
use crate::db::{self, DbPool};
use crate::entities::inventory_item::{self, Entity as InventoryItemEntity};
use crate::entities::inventory_location::{self, Entity as InventoryLocationEntity};
use crate::entities::inventory_transaction::TransactionType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub inventory_item_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: i32,
    pub reference_id: Option<String>,
    pub reference_type: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// Item and location as they stand after the allocation committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub item: inventory_item::Model,
    pub location: inventory_location::Model,
}

/// One location row in a warehouse, paired with its item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStock {
    pub location: inventory_location::Model,
    pub item: inventory_item::Model,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    In,
    Out,
}

#[derive(Clone)]
pub struct WarehouseAllocationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    max_page_size: u64,
}

impl WarehouseAllocationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, max_page_size: u64) -> Self {
        Self {
            db_pool,
            event_sender,
            max_page_size,
        }
    }

    /// Receives stock into a warehouse, creating the location row on first use.
    #[instrument(skip(self, ctx, request), fields(item_id = %request.inventory_item_id, warehouse_id = %request.warehouse_id, quantity = request.quantity))]
    pub async fn add_inventory_to_location(
        &self,
        ctx: &CallContext,
        request: AllocationRequest,
    ) -> Result<AllocationResult, ServiceError> {
        self.allocate(ctx, request, Direction::In).await
    }

    /// Takes available stock out of a warehouse. Inactive warehouses can still be drained.
    #[instrument(skip(self, ctx, request), fields(item_id = %request.inventory_item_id, warehouse_id = %request.warehouse_id, quantity = request.quantity))]
    pub async fn remove_inventory_from_location(
        &self,
        ctx: &CallContext,
        request: AllocationRequest,
    ) -> Result<AllocationResult, ServiceError> {
        self.allocate(ctx, request, Direction::Out).await
    }

    async fn allocate(
        &self,
        ctx: &CallContext,
        request: AllocationRequest,
        direction: Direction,
    ) -> Result<AllocationResult, ServiceError> {
        if request.quantity <= 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "Quantity must be positive, got {}",
                request.quantity
            )));
        }

        let (label, delta, transaction_type) = match direction {
            Direction::In => (
                "add_inventory_to_location",
                QuantityDelta::stock_in(request.quantity),
                TransactionType::StockAddition,
            ),
            Direction::Out => (
                "remove_inventory_from_location",
                QuantityDelta::stock_out(request.quantity),
                TransactionType::StockRemoval,
            ),
        };

        let item_id = request.inventory_item_id;
        let warehouse_id = request.warehouse_id;
        let quantity = request.quantity;
        let reference_id = request.reference_id.clone();

        let (mutation, location): (ItemMutation, inventory_location::Model) =
            db::transaction(self.db_pool.as_ref(), label, ctx, move |txn| {
                Box::pin(async move {
                    match direction {
                        Direction::In => fetch_active_warehouse(txn, warehouse_id).await?,
                        Direction::Out => fetch_warehouse(txn, warehouse_id).await?,
                    };

                    let mutation = ledger::apply_to_item(txn, item_id, delta).await?;
                    if direction == Direction::In {
                        ledger::ensure_location(txn, item_id, warehouse_id).await?;
                    }
                    let location =
                        ledger::apply_to_location(txn, item_id, warehouse_id, delta).await?;

                    ledger::record_transaction(
                        txn,
                        AuditEntry::new(item_id, Some(warehouse_id), transaction_type, quantity)
                            .with_reference(request.reference_id, request.reference_type)
                            .with_notes(request.notes)
                            .with_created_by(request.created_by),
                    )
                    .await;

                    Ok((mutation, location))
                })
            })
            .await?;

        let event = match direction {
            Direction::In => {
                counter!("inventory.stock_added", quantity as u64);
                Event::StockAdded {
                    inventory_item_id: item_id,
                    warehouse_id,
                    quantity,
                    reference_id,
                }
            }
            Direction::Out => {
                counter!("inventory.stock_removed", quantity as u64);
                Event::StockRemoved {
                    inventory_item_id: item_id,
                    warehouse_id,
                    quantity,
                    reference_id,
                }
            }
        };

        info!(
            inventory_item_id = %item_id,
            warehouse_id = %warehouse_id,
            quantity,
            transaction_type = %transaction_type,
            item_available = mutation.item.available_quantity,
            location_available = location.available_quantity,
            "Inventory allocation committed"
        );

        self.event_sender.publish(event);
        if mutation.crossed_into_low_stock() {
            self.event_sender.publish(low_stock_event(&mutation.item));
        }

        Ok(AllocationResult {
            item: mutation.item,
            location,
        })
    }

    /// Location rows held in a warehouse, oldest first, each paired with its item.
    #[instrument(skip(self))]
    pub async fn get_inventory_by_location(
        &self,
        warehouse_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<LocationStock>, u64), ServiceError> {
        validate_pagination(page, limit, self.max_page_size)?;
        let db = self.db_pool.as_ref();
        fetch_warehouse(db, warehouse_id).await?;

        let paginator = InventoryLocationEntity::find()
            .filter(inventory_location::Column::WarehouseId.eq(warehouse_id))
            .order_by_asc(inventory_location::Column::CreatedAt)
            .order_by_asc(inventory_location::Column::Id)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let locations = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        let item_ids: Vec<Uuid> = locations.iter().map(|l| l.inventory_item_id).collect();
        let mut items: HashMap<Uuid, inventory_item::Model> = if item_ids.is_empty() {
            HashMap::new()
        } else {
            InventoryItemEntity::find()
                .filter(inventory_item::Column::Id.is_in(item_ids))
                .all(db)
                .await
                .map_err(ServiceError::db_error)?
                .into_iter()
                .map(|item| (item.id, item))
                .collect()
        };

        let rows = locations
            .into_iter()
            .filter_map(|location| {
                items
                    .remove(&location.inventory_item_id)
                    .map(|item| LocationStock { location, item })
            })
            .collect();

        Ok((rows, total))
    }
}
