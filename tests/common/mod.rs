#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use inventory_engine::{
    config::EngineConfig,
    db::{self, DbPool},
    entities::{
        inventory_item, inventory_location, inventory_reservation, inventory_transaction,
        warehouse,
    },
    events::{self, EventSender},
    services::{
        allocation::AllocationRequest,
        inventory_items::{CreateInventoryItemInput, InventoryItemWithLocations, LocationSplit},
        warehouses::CreateWarehouseInput,
    },
    CallContext, InventoryEngine,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

/// Engine backed by a private in-memory SQLite database with migrations applied.
pub struct TestEngine {
    pub engine: InventoryEngine,
    pub db: Arc<DbPool>,
    pub config: EngineConfig,
    pub ctx: CallContext,
    _event_task: Option<tokio::task::JoinHandle<()>>,
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: EngineConfig) -> Self {
        let (sender, rx) = EventSender::channel(config.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(rx));
        Self::build(config, sender, Some(event_task)).await
    }

    /// Engine publishing into `sender`; the caller owns the receiving end.
    pub async fn with_event_sender(config: EngineConfig, sender: EventSender) -> Self {
        Self::build(config, sender, None).await
    }

    async fn build(
        config: EngineConfig,
        sender: EventSender,
        event_task: Option<tokio::task::JoinHandle<()>>,
    ) -> Self {
        let pool = db::establish_connection_from_config(&config)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let engine = InventoryEngine::new(db.clone(), sender, &config);

        Self {
            engine,
            db,
            config,
            ctx: CallContext::new(),
            _event_task: event_task,
        }
    }

    pub async fn warehouse(&self, code: &str) -> warehouse::Model {
        self.warehouse_with(code, true, 0).await
    }

    pub async fn warehouse_with(&self, code: &str, is_active: bool, priority: i32) -> warehouse::Model {
        self.engine
            .create_warehouse(
                &self.ctx,
                CreateWarehouseInput {
                    name: format!("Warehouse {}", code),
                    code: code.to_string(),
                    city: Some("Reno".into()),
                    country: Some("US".into()),
                    priority,
                    is_active: Some(is_active),
                    ..Default::default()
                },
            )
            .await
            .expect("create warehouse")
    }

    /// Item whose opening stock is not tied to any warehouse.
    pub async fn item(&self, sku: &str, quantity: i32, reorder_point: i32) -> inventory_item::Model {
        self.engine
            .create_inventory_item(
                &self.ctx,
                CreateInventoryItemInput {
                    product_id: Uuid::new_v4(),
                    sku: sku.to_string(),
                    initial_quantity: quantity,
                    reorder_point,
                    reorder_quantity: 50,
                    ..Default::default()
                },
            )
            .await
            .expect("create inventory item")
            .item
    }

    /// Item whose opening stock sits entirely in `warehouse_id`.
    pub async fn item_in(
        &self,
        sku: &str,
        warehouse_id: Uuid,
        quantity: i32,
        reorder_point: i32,
    ) -> InventoryItemWithLocations {
        self.engine
            .create_inventory_item(
                &self.ctx,
                CreateInventoryItemInput {
                    product_id: Uuid::new_v4(),
                    sku: sku.to_string(),
                    initial_quantity: quantity,
                    reorder_point,
                    reorder_quantity: 50,
                    initial_locations: vec![LocationSplit {
                        warehouse_id,
                        quantity,
                    }],
                    ..Default::default()
                },
            )
            .await
            .expect("create inventory item with location")
    }

    pub fn allocation(&self, item_id: Uuid, warehouse_id: Uuid, quantity: i32) -> AllocationRequest {
        AllocationRequest {
            inventory_item_id: item_id,
            warehouse_id,
            quantity,
            reference_id: Some("PO-1001".into()),
            reference_type: Some("PURCHASE_ORDER".into()),
            notes: None,
            created_by: Some("tests".into()),
        }
    }

    pub async fn fetch_item(&self, id: Uuid) -> inventory_item::Model {
        inventory_item::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("query item")
            .expect("item exists")
    }

    pub async fn fetch_location(&self, item_id: Uuid, warehouse_id: Uuid) -> Option<inventory_location::Model> {
        inventory_location::Entity::find()
            .filter(inventory_location::Column::InventoryItemId.eq(item_id))
            .filter(inventory_location::Column::WarehouseId.eq(warehouse_id))
            .one(self.db.as_ref())
            .await
            .expect("query location")
    }

    pub async fn fetch_reservation(&self, id: Uuid) -> inventory_reservation::Model {
        inventory_reservation::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .expect("query reservation")
            .expect("reservation exists")
    }

    pub async fn reservation_count(&self) -> usize {
        inventory_reservation::Entity::find()
            .all(self.db.as_ref())
            .await
            .expect("query reservations")
            .len()
    }

    pub async fn audit_trail(&self, item_id: Uuid) -> Vec<inventory_transaction::Model> {
        inventory_transaction::Entity::find()
            .filter(inventory_transaction::Column::InventoryItemId.eq(item_id))
            .order_by_asc(inventory_transaction::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .expect("query audit trail")
    }

    /// Moves a reservation's expiration time into the past.
    pub async fn backdate_reservation(&self, id: Uuid) {
        let reservation = self.fetch_reservation(id).await;
        let mut active: inventory_reservation::ActiveModel = reservation.into();
        active.expiration_time = Set(Utc::now() - Duration::minutes(5));
        active
            .update(self.db.as_ref())
            .await
            .expect("backdate reservation");
    }

    pub async fn assert_balanced(&self, item_id: Uuid) {
        let item = self.fetch_item(item_id).await;
        assert!(item.is_balanced(), "item out of balance: {:?}", item);

        let locations = inventory_location::Entity::find()
            .filter(inventory_location::Column::InventoryItemId.eq(item_id))
            .all(self.db.as_ref())
            .await
            .expect("query locations");
        for location in locations {
            assert!(location.is_balanced(), "location out of balance: {:?}", location);
        }
    }

    /// The item's quantities equal the sums over its location rows.
    pub async fn assert_reconciled(&self, item_id: Uuid) {
        let item = self.fetch_item(item_id).await;
        let locations = inventory_location::Entity::find()
            .filter(inventory_location::Column::InventoryItemId.eq(item_id))
            .all(self.db.as_ref())
            .await
            .expect("query locations");

        let total: i32 = locations.iter().map(|l| l.quantity).sum();
        let available: i32 = locations.iter().map(|l| l.available_quantity).sum();
        let reserved: i32 = locations.iter().map(|l| l.reserved_quantity).sum();
        assert_eq!(item.total_quantity, total, "item total drifted from its locations");
        assert_eq!(item.available_quantity, available, "item available drifted from its locations");
        assert_eq!(item.reserved_quantity, reserved, "item reserved drifted from its locations");
    }
}

pub fn test_config() -> EngineConfig {
    let mut cfg = EngineConfig::new("sqlite::memory:");
    // One connection serialises transactions; concurrency tests widen the pool.
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;
    cfg.db_acquire_timeout_secs = 30;
    cfg.reaper_interval_secs = 1;
    cfg
}
