//! The operation surface of the inventory engine.
//!
//! Every call takes a [`CallContext`]. Reads are raced against it outright.
//! Writes honour it only until their transaction commits, so a call that
//! reports `Cancelled` or `DeadlineExceeded` changed nothing.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::context::CallContext;
use crate::db::DbPool;
use crate::entities::{inventory_item, inventory_reservation, warehouse};
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::allocation::{
    AllocationRequest, AllocationResult, LocationStock, WarehouseAllocationService,
};
use crate::services::availability::{
    AvailabilityReport, AvailabilityRequestLine, AvailabilityService,
};
use crate::services::inventory_items::{
    CreateInventoryItemInput, InventoryItemLookup, InventoryItemService,
    InventoryItemWithLocations, ListInventoryItemsQuery, UpdateInventoryItemInput,
};
use crate::services::reaper::ExpirationReaper;
use crate::services::reservations::{
    CleanupResult, InventoryReservationService, ReservationStats, ReservationSummary,
    ReserveInventoryRequest, ReserveInventoryResult,
};
use crate::services::warehouses::{
    CreateWarehouseInput, UpdateWarehouseInput, WarehouseLookup, WarehouseService,
};

#[derive(Clone)]
pub struct InventoryEngine {
    warehouses: WarehouseService,
    items: InventoryItemService,
    allocation: WarehouseAllocationService,
    reservations: InventoryReservationService,
    availability: AvailabilityService,
    reaper_interval: Duration,
}

impl InventoryEngine {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender, config: &EngineConfig) -> Self {
        let event_sender = Arc::new(event_sender);
        Self {
            warehouses: WarehouseService::new(db_pool.clone(), config.max_page_size),
            items: InventoryItemService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.max_page_size,
            ),
            allocation: WarehouseAllocationService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.max_page_size,
            ),
            reservations: InventoryReservationService::new(
                db_pool.clone(),
                event_sender,
                config.reservation_default_expiration_minutes,
                config.reaper_batch_size,
            ),
            availability: AvailabilityService::new(db_pool),
            reaper_interval: config.reaper_interval(),
        }
    }

    // Inventory items

    pub async fn create_inventory_item(
        &self,
        ctx: &CallContext,
        input: CreateInventoryItemInput,
    ) -> Result<InventoryItemWithLocations, ServiceError> {
        self.items.create_inventory_item(ctx, input).await
    }

    pub async fn get_inventory_item(
        &self,
        ctx: &CallContext,
        lookup: InventoryItemLookup,
    ) -> Result<inventory_item::Model, ServiceError> {
        ctx.run(self.items.get_inventory_item(lookup)).await
    }

    pub async fn get_inventory_item_with_locations(
        &self,
        ctx: &CallContext,
        lookup: InventoryItemLookup,
    ) -> Result<InventoryItemWithLocations, ServiceError> {
        ctx.run(self.items.get_inventory_item_with_locations(lookup))
            .await
    }

    pub async fn update_inventory_item(
        &self,
        ctx: &CallContext,
        id: Uuid,
        input: UpdateInventoryItemInput,
    ) -> Result<inventory_item::Model, ServiceError> {
        self.items.update_inventory_item(ctx, id, input).await
    }

    pub async fn list_inventory_items(
        &self,
        ctx: &CallContext,
        query: ListInventoryItemsQuery,
    ) -> Result<(Vec<InventoryItemWithLocations>, u64), ServiceError> {
        ctx.run(self.items.list_inventory_items(query)).await
    }

    // Warehouses

    pub async fn create_warehouse(
        &self,
        ctx: &CallContext,
        input: CreateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        self.warehouses.create_warehouse(ctx, input).await
    }

    pub async fn get_warehouse(
        &self,
        ctx: &CallContext,
        lookup: WarehouseLookup,
    ) -> Result<warehouse::Model, ServiceError> {
        ctx.run(self.warehouses.get_warehouse(lookup)).await
    }

    pub async fn update_warehouse(
        &self,
        ctx: &CallContext,
        id: Uuid,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        self.warehouses.update_warehouse(ctx, id, input).await
    }

    pub async fn list_warehouses(
        &self,
        ctx: &CallContext,
        page: u64,
        limit: u64,
        is_active: Option<bool>,
    ) -> Result<(Vec<warehouse::Model>, u64), ServiceError> {
        ctx.run(self.warehouses.list_warehouses(page, limit, is_active))
            .await
    }

    // Allocation

    pub async fn add_inventory_to_location(
        &self,
        ctx: &CallContext,
        request: AllocationRequest,
    ) -> Result<AllocationResult, ServiceError> {
        self.allocation.add_inventory_to_location(ctx, request).await
    }

    pub async fn remove_inventory_from_location(
        &self,
        ctx: &CallContext,
        request: AllocationRequest,
    ) -> Result<AllocationResult, ServiceError> {
        self.allocation
            .remove_inventory_from_location(ctx, request)
            .await
    }

    pub async fn get_inventory_by_location(
        &self,
        ctx: &CallContext,
        warehouse_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<LocationStock>, u64), ServiceError> {
        ctx.run(
            self.allocation
                .get_inventory_by_location(warehouse_id, page, limit),
        )
        .await
    }

    // Reservations

    pub async fn reserve_inventory(
        &self,
        ctx: &CallContext,
        request: ReserveInventoryRequest,
    ) -> Result<ReserveInventoryResult, ServiceError> {
        self.reservations.reserve_inventory(ctx, request).await
    }

    pub async fn confirm_reservation(
        &self,
        ctx: &CallContext,
        reservation_id: Uuid,
    ) -> Result<inventory_reservation::Model, ServiceError> {
        self.reservations
            .confirm_reservation(ctx, reservation_id)
            .await
    }

    pub async fn cancel_reservation(
        &self,
        ctx: &CallContext,
        reservation_id: Uuid,
    ) -> Result<inventory_reservation::Model, ServiceError> {
        self.reservations
            .cancel_reservation(ctx, reservation_id)
            .await
    }

    pub async fn get_reservation(
        &self,
        ctx: &CallContext,
        reservation_id: Uuid,
    ) -> Result<ReservationSummary, ServiceError> {
        ctx.run(self.reservations.get_reservation(reservation_id))
            .await
    }

    pub async fn list_reservations_by_reference(
        &self,
        ctx: &CallContext,
        reference_id: &str,
        reference_type: &str,
    ) -> Result<Vec<ReservationSummary>, ServiceError> {
        ctx.run(
            self.reservations
                .list_reservations_by_reference(reference_id, reference_type),
        )
        .await
    }

    pub async fn reservation_stats(
        &self,
        ctx: &CallContext,
    ) -> Result<ReservationStats, ServiceError> {
        ctx.run(self.reservations.reservation_stats()).await
    }

    pub async fn clean_expired_reservations(
        &self,
        ctx: &CallContext,
    ) -> Result<CleanupResult, ServiceError> {
        self.reservations.clean_expired_reservations(ctx).await
    }

    // Availability

    pub async fn check_inventory_availability(
        &self,
        ctx: &CallContext,
        lines: Vec<AvailabilityRequestLine>,
    ) -> Result<AvailabilityReport, ServiceError> {
        ctx.run(self.availability.check_inventory_availability(lines))
            .await
    }

    /// Reaper sweeping on the configured interval.
    pub fn expiration_reaper(&self) -> ExpirationReaper {
        ExpirationReaper::new(self.reservations.clone(), self.reaper_interval)
    }

    pub fn reservations(&self) -> &InventoryReservationService {
        &self.reservations
    }
}
