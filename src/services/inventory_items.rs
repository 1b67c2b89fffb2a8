//! Inventory item store.
//!
//! Items carry the aggregate quantity triple for a SKU. Creation optionally
//! splits the opening stock across warehouses; after that, quantities only
//! move through the allocation and reservation services.

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::ledger::{self, AuditEntry, QuantityDelta};
use super::warehouses::fetch_active_warehouse;
use super::{require_non_blank, validate_pagination};
use crate::context::CallContext;
use crate::db::{self, DbPool};
use crate::entities::inventory_item::{self, Entity as InventoryItemEntity, InventoryStatus};
use crate::entities::inventory_location::{self, Entity as InventoryLocationEntity};
use crate::entities::inventory_transaction::TransactionType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Ways to address a single inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryItemLookup {
    Id(Uuid),
    /// Resolves to the oldest item for the product.
    ProductId(Uuid),
    Sku(String),
}

/// Opening stock placed in one warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSplit {
    pub warehouse_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInventoryItemInput {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub sku: String,
    pub initial_quantity: i32,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    /// When non-empty, quantities must add up to `initial_quantity`.
    #[serde(default)]
    pub initial_locations: Vec<LocationSplit>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateInventoryItemInput {
    pub reorder_point: Option<i32>,
    pub reorder_quantity: Option<i32>,
    /// Overrides the computed status until the next quantity change.
    pub status: Option<InventoryStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListInventoryItemsQuery {
    pub page: u64,
    pub limit: u64,
    pub status: Option<InventoryStatus>,
    pub warehouse_id: Option<Uuid>,
    #[serde(default)]
    pub low_stock_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemWithLocations {
    #[serde(flatten)]
    pub item: inventory_item::Model,
    pub locations: Vec<inventory_location::Model>,
}

#[derive(Clone)]
pub struct InventoryItemService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    max_page_size: u64,
}

impl InventoryItemService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, max_page_size: u64) -> Self {
        Self {
            db_pool,
            event_sender,
            max_page_size,
        }
    }

    #[instrument(skip(self, ctx, input), fields(sku = %input.sku))]
    pub async fn create_inventory_item(
        &self,
        ctx: &CallContext,
        input: CreateInventoryItemInput,
    ) -> Result<InventoryItemWithLocations, ServiceError> {
        let sku = require_non_blank(&input.sku, "sku")?;
        for (field, value) in [
            ("initial_quantity", input.initial_quantity),
            ("reorder_point", input.reorder_point),
            ("reorder_quantity", input.reorder_quantity),
        ] {
            if value < 0 {
                return Err(ServiceError::InvalidQuantity(format!(
                    "{} must not be negative, got {}",
                    field, value
                )));
            }
        }
        validate_splits(input.initial_quantity, &input.initial_locations)?;

        let db = self.db_pool.as_ref();

        if find_by_sku(db, &sku).await?.is_some() {
            return Err(ServiceError::AlreadyExists(format!(
                "SKU {} is already in use",
                sku
            )));
        }

        let status = InventoryStatus::determine(input.initial_quantity, input.reorder_point);
        let splits = input.initial_locations.clone();
        let created_by = input.created_by.clone();
        let conflict_sku = sku.clone();

        let created = db::transaction(db, "create_inventory_item", ctx, move |txn| {
            Box::pin(async move {
                let now = Utc::now();
                let item = inventory_item::ActiveModel {
                    product_id: Set(input.product_id),
                    variant_id: Set(input.variant_id),
                    sku: Set(sku),
                    total_quantity: Set(input.initial_quantity),
                    available_quantity: Set(input.initial_quantity),
                    reserved_quantity: Set(0),
                    reorder_point: Set(input.reorder_point),
                    reorder_quantity: Set(input.reorder_quantity),
                    status: Set(status),
                    last_updated: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(|e| {
                    ServiceError::from_write_error(e, || {
                        format!("SKU {} is already in use", conflict_sku)
                    })
                })?;

                let mut locations = Vec::with_capacity(splits.len());
                for split in &splits {
                    fetch_active_warehouse(txn, split.warehouse_id).await?;
                    ledger::ensure_location(txn, item.id, split.warehouse_id).await?;
                    if split.quantity > 0 {
                        let location = ledger::apply_to_location(
                            txn,
                            item.id,
                            split.warehouse_id,
                            QuantityDelta::stock_in(split.quantity),
                        )
                        .await?;
                        ledger::record_transaction(
                            txn,
                            AuditEntry::new(
                                item.id,
                                Some(split.warehouse_id),
                                TransactionType::StockAddition,
                                split.quantity,
                            )
                            .with_notes(Some("Opening stock".to_string()))
                            .with_created_by(created_by.clone()),
                        )
                        .await;
                        locations.push(location);
                    } else if let Some(location) =
                        ledger::find_location(txn, item.id, split.warehouse_id).await?
                    {
                        locations.push(location);
                    }
                }

                if splits.is_empty() && item.total_quantity > 0 {
                    ledger::record_transaction(
                        txn,
                        AuditEntry::new(
                            item.id,
                            None,
                            TransactionType::StockAddition,
                            item.total_quantity,
                        )
                        .with_notes(Some("Opening stock".to_string()))
                        .with_created_by(created_by),
                    )
                    .await;
                }

                Ok(InventoryItemWithLocations { item, locations })
            })
        })
        .await?;

        info!(
            inventory_item_id = %created.item.id,
            sku = %created.item.sku,
            total_quantity = created.item.total_quantity,
            status = %created.item.status,
            "Inventory item created"
        );

        if created.item.status != InventoryStatus::InStock {
            self.event_sender.publish(low_stock_event(&created.item));
        }

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_inventory_item(
        &self,
        lookup: InventoryItemLookup,
    ) -> Result<inventory_item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        match lookup {
            InventoryItemLookup::Id(id) => InventoryItemEntity::find_by_id(id)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id))),
            InventoryItemLookup::ProductId(product_id) => {
                find_by_product(db, product_id, None).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!(
                        "No inventory item for product {}",
                        product_id
                    ))
                })
            }
            InventoryItemLookup::Sku(sku) => {
                let sku = require_non_blank(&sku, "sku")?;
                find_by_sku(db, &sku)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("SKU {} not found", sku)))
            }
        }
    }

    /// Item together with all of its location rows.
    #[instrument(skip(self))]
    pub async fn get_inventory_item_with_locations(
        &self,
        lookup: InventoryItemLookup,
    ) -> Result<InventoryItemWithLocations, ServiceError> {
        let item = self.get_inventory_item(lookup).await?;
        let locations = InventoryLocationEntity::find()
            .filter(inventory_location::Column::InventoryItemId.eq(item.id))
            .order_by_asc(inventory_location::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(InventoryItemWithLocations { item, locations })
    }

    #[instrument(skip(self, ctx))]
    pub async fn update_inventory_item(
        &self,
        ctx: &CallContext,
        id: Uuid,
        input: UpdateInventoryItemInput,
    ) -> Result<inventory_item::Model, ServiceError> {
        for (field, value) in [
            ("reorder_point", input.reorder_point),
            ("reorder_quantity", input.reorder_quantity),
        ] {
            if let Some(value) = value.filter(|v| *v < 0) {
                return Err(ServiceError::InvalidQuantity(format!(
                    "{} must not be negative, got {}",
                    field, value
                )));
            }
        }

        let updated = db::transaction(
            self.db_pool.as_ref(),
            "update_inventory_item",
            ctx,
            move |txn| {
                Box::pin(async move {
                    let existing = InventoryItemEntity::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Inventory item {} not found", id))
                        })?;

                    let reorder_point = input.reorder_point.unwrap_or(existing.reorder_point);
                    let status = input.status.unwrap_or_else(|| {
                        InventoryStatus::determine(existing.available_quantity, reorder_point)
                    });

                    let mut active: inventory_item::ActiveModel = existing.into();
                    if let Some(reorder_point) = input.reorder_point {
                        active.reorder_point = Set(reorder_point);
                    }
                    if let Some(reorder_quantity) = input.reorder_quantity {
                        active.reorder_quantity = Set(reorder_quantity);
                    }
                    active.status = Set(status);

                    active.update(txn).await.map_err(ServiceError::db_error)
                })
            },
        )
        .await?;

        info!(
            inventory_item_id = %updated.id,
            reorder_point = updated.reorder_point,
            status = %updated.status,
            "Inventory item updated"
        );
        Ok(updated)
    }

    /// Pages through items, oldest first, with their location rows attached.
    #[instrument(skip(self))]
    pub async fn list_inventory_items(
        &self,
        query: ListInventoryItemsQuery,
    ) -> Result<(Vec<InventoryItemWithLocations>, u64), ServiceError> {
        validate_pagination(query.page, query.limit, self.max_page_size)?;
        let db = self.db_pool.as_ref();

        let mut select = InventoryItemEntity::find();
        if let Some(status) = query.status {
            select = select.filter(inventory_item::Column::Status.eq(status.as_str()));
        }
        if let Some(warehouse_id) = query.warehouse_id {
            select = select.filter(
                inventory_item::Column::Id.in_subquery(
                    Query::select()
                        .column(inventory_location::Column::InventoryItemId)
                        .from(InventoryLocationEntity)
                        .and_where(inventory_location::Column::WarehouseId.eq(warehouse_id))
                        .to_owned(),
                ),
            );
        }
        if query.low_stock_only {
            select = select.filter(
                Expr::col(inventory_item::Column::AvailableQuantity)
                    .lte(Expr::col(inventory_item::Column::ReorderPoint)),
            );
        }

        let paginator = select
            .order_by_asc(inventory_item::Column::CreatedAt)
            .order_by_asc(inventory_item::Column::Sku)
            .paginate(db, query.limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(query.page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        let ids: Vec<Uuid> = items.iter().map(|item| item.id).collect();
        let mut by_item: HashMap<Uuid, Vec<inventory_location::Model>> = HashMap::new();
        if !ids.is_empty() {
            let locations = InventoryLocationEntity::find()
                .filter(inventory_location::Column::InventoryItemId.is_in(ids))
                .order_by_asc(inventory_location::Column::CreatedAt)
                .all(db)
                .await
                .map_err(ServiceError::db_error)?;
            for location in locations {
                by_item
                    .entry(location.inventory_item_id)
                    .or_default()
                    .push(location);
            }
        }

        let rows = items
            .into_iter()
            .map(|item| {
                let locations = by_item.remove(&item.id).unwrap_or_default();
                InventoryItemWithLocations { item, locations }
            })
            .collect();

        Ok((rows, total))
    }
}

fn validate_splits(initial_quantity: i32, splits: &[LocationSplit]) -> Result<(), ServiceError> {
    if splits.is_empty() {
        return Ok(());
    }

    let mut seen = HashSet::with_capacity(splits.len());
    let mut sum: i64 = 0;
    for split in splits {
        if split.quantity < 0 {
            return Err(ServiceError::InvalidQuantity(format!(
                "Opening stock for warehouse {} must not be negative",
                split.warehouse_id
            )));
        }
        if !seen.insert(split.warehouse_id) {
            return Err(ServiceError::InvalidInput(format!(
                "Warehouse {} appears more than once in initial_locations",
                split.warehouse_id
            )));
        }
        sum += i64::from(split.quantity);
    }

    if sum != i64::from(initial_quantity) {
        return Err(ServiceError::InvalidInput(format!(
            "initial_locations add up to {} but initial_quantity is {}",
            sum, initial_quantity
        )));
    }
    Ok(())
}

pub(crate) async fn find_by_sku<C>(
    conn: &C,
    sku: &str,
) -> Result<Option<inventory_item::Model>, ServiceError>
where
    C: sea_orm::ConnectionTrait,
{
    InventoryItemEntity::find()
        .filter(inventory_item::Column::Sku.eq(sku))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Oldest item for a product, narrowed to a variant when one is given.
pub(crate) async fn find_by_product<C>(
    conn: &C,
    product_id: Uuid,
    variant_id: Option<Uuid>,
) -> Result<Option<inventory_item::Model>, ServiceError>
where
    C: sea_orm::ConnectionTrait,
{
    let mut select = InventoryItemEntity::find()
        .filter(inventory_item::Column::ProductId.eq(product_id));
    if let Some(variant_id) = variant_id {
        select = select.filter(inventory_item::Column::VariantId.eq(variant_id));
    }
    select
        .order_by_asc(inventory_item::Column::CreatedAt)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub(crate) fn low_stock_event(item: &inventory_item::Model) -> Event {
    Event::LowStockDetected {
        inventory_item_id: item.id,
        sku: item.sku.clone(),
        available_quantity: item.available_quantity,
        reorder_point: item.reorder_point,
        status: item.status,
    }
}
