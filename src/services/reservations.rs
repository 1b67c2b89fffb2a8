//! Inventory Reservation Service
//!
//! Places time-bounded holds on stock and resolves them. A reservation leaves
//! `PENDING` exactly once, through a guarded `UPDATE ... WHERE status =
//! 'PENDING'`, so confirm, cancel and the expiry sweep can race freely and
//! only one of them ever moves quantities.

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::inventory_items::low_stock_event;
use super::ledger::{self, AuditEntry, QuantityDelta};
use super::require_non_blank;
use super::warehouses::fetch_active_warehouse;
use crate::context::CallContext;
use crate::db::{self, DbPool};
use crate::entities::inventory_item;
use crate::entities::inventory_reservation::{
    self, Entity as InventoryReservationEntity, ReservationStatus,
};
use crate::entities::inventory_transaction::TransactionType;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Reference type written on audit records produced by resolving a reservation.
pub const RESERVATION_REFERENCE_TYPE: &str = "RESERVATION";

/// One requested hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationLine {
    pub inventory_item_id: Uuid,
    pub quantity: i32,
    /// Without a warehouse the hold is placed in the highest-priority active
    /// warehouse whose location can cover it.
    pub warehouse_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReserveInventoryRequest {
    pub items: Vec<ReservationLine>,
    pub reference_id: String,
    pub reference_type: String,
    /// Zero or negative selects the configured default.
    #[serde(default)]
    pub expiration_minutes: i64,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReserveInventoryResult {
    /// One row per requested line, in request order.
    pub reservations: Vec<inventory_reservation::Model>,
    pub expiration_time: DateTime<Utc>,
}

/// Result of cleaning up expired reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResult {
    /// Number of reservations cancelled because they expired.
    pub expired_count: u64,
    /// Reservations resolved by a concurrent confirm or cancel before the sweep reached them.
    pub skipped_count: u64,
    /// Reservations whose release failed; they stay pending for the next sweep.
    pub failed_count: u64,
    /// Timestamp when cleanup was performed.
    pub cleaned_at: DateTime<Utc>,
}

impl CleanupResult {
    /// Reservations this run looked at, whatever the outcome.
    pub fn processed(&self) -> u64 {
        self.expired_count + self.skipped_count + self.failed_count
    }
}

/// Summary of a reservation for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationSummary {
    pub id: Uuid,
    pub inventory_item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub status: ReservationStatus,
    pub reference_id: Option<String>,
    pub reference_type: String,
    pub expiration_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Pending and past its expiration time.
    pub is_expired: bool,
}

impl From<inventory_reservation::Model> for ReservationSummary {
    fn from(model: inventory_reservation::Model) -> Self {
        let is_expired =
            model.status == ReservationStatus::Pending && model.is_expired_at(Utc::now());
        Self {
            id: model.id,
            inventory_item_id: model.inventory_item_id,
            warehouse_id: model.warehouse_id,
            quantity: model.quantity,
            status: model.status,
            reference_id: model.reference_id,
            reference_type: model.reference_type,
            expiration_time: model.expiration_time,
            created_at: model.created_at,
            updated_at: model.updated_at,
            is_expired,
        }
    }
}

/// Reservation counts for operators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationStats {
    pub pending: u64,
    pub confirmed: u64,
    pub cancelled: u64,
    /// Pending reservations the sweep has not reached yet.
    pub pending_expired: u64,
}

/// Outcome of trying to release a pending reservation.
#[derive(Debug, Clone)]
enum ReleaseOutcome {
    Released(inventory_reservation::Model),
    /// Another writer moved the reservation out of `PENDING` first.
    AlreadyResolved(inventory_reservation::Model),
}

/// Service for managing inventory reservations.
#[derive(Clone)]
pub struct InventoryReservationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    default_expiration_minutes: i64,
    sweep_batch_size: u64,
}

impl InventoryReservationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        default_expiration_minutes: i64,
        sweep_batch_size: u64,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            default_expiration_minutes,
            sweep_batch_size: sweep_batch_size.max(1),
        }
    }

    /// Places every requested hold or none of them.
    ///
    /// Lines are applied in `(item, warehouse)` order so that concurrent
    /// batches touching the same rows lock them in the same sequence. The
    /// item row is always locked before any of its locations.
    #[instrument(skip(self, ctx, request), fields(reference_id = %request.reference_id, reference_type = %request.reference_type, lines = request.items.len()))]
    pub async fn reserve_inventory(
        &self,
        ctx: &CallContext,
        request: ReserveInventoryRequest,
    ) -> Result<ReserveInventoryResult, ServiceError> {
        if request.items.is_empty() {
            return Err(ServiceError::InvalidInput(
                "At least one item is required".to_string(),
            ));
        }
        let reference_type = require_non_blank(&request.reference_type, "reference_type")?;
        if let Some(line) = request.items.iter().find(|line| line.quantity <= 0) {
            return Err(ServiceError::InvalidQuantity(format!(
                "Quantity for item {} must be positive, got {}",
                line.inventory_item_id, line.quantity
            )));
        }

        let minutes = if request.expiration_minutes <= 0 {
            self.default_expiration_minutes
        } else {
            request.expiration_minutes
        };
        let expiration_time = Duration::try_minutes(minutes)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("expiration_minutes {} is out of range", minutes))
            })?;

        let reference_id = Some(request.reference_id.trim().to_string()).filter(|r| !r.is_empty());
        let lines = request.items.clone();
        let created_by = request.created_by.clone();
        let txn_reference_id = reference_id.clone();
        let txn_reference_type = reference_type.clone();

        let (reservations, low_stock) = db::transaction(
            self.db_pool.as_ref(),
            "reserve_inventory",
            ctx,
            move |txn| {
                Box::pin(async move {
                    let mut order: Vec<usize> = (0..lines.len()).collect();
                    order.sort_by_key(|&i| (lines[i].inventory_item_id, lines[i].warehouse_id));

                    let mut slots: Vec<Option<inventory_reservation::Model>> =
                        vec![None; lines.len()];
                    let mut low_stock: Vec<inventory_item::Model> = Vec::new();

                    for index in order {
                        let line = lines[index];
                        let delta = QuantityDelta::reserve(line.quantity);

                        if let Some(warehouse_id) = line.warehouse_id {
                            fetch_active_warehouse(txn, warehouse_id).await?;
                        }

                        let mutation =
                            ledger::apply_to_item(txn, line.inventory_item_id, delta).await?;
                        let warehouse_id = match line.warehouse_id {
                            Some(warehouse_id) => {
                                ledger::apply_to_location(
                                    txn,
                                    line.inventory_item_id,
                                    warehouse_id,
                                    delta,
                                )
                                .await?;
                                Some(warehouse_id)
                            }
                            None => {
                                hold_in_preferred_location(
                                    txn,
                                    line.inventory_item_id,
                                    line.quantity,
                                )
                                .await?
                            }
                        };
                        if mutation.crossed_into_low_stock() {
                            low_stock.push(mutation.item.clone());
                        }

                        let reservation = inventory_reservation::ActiveModel {
                            inventory_item_id: Set(line.inventory_item_id),
                            warehouse_id: Set(warehouse_id),
                            quantity: Set(line.quantity),
                            status: Set(ReservationStatus::Pending),
                            expiration_time: Set(expiration_time),
                            reference_id: Set(txn_reference_id.clone()),
                            reference_type: Set(txn_reference_type.clone()),
                            ..Default::default()
                        };
                        let reservation = reservation
                            .insert(txn)
                            .await
                            .map_err(ServiceError::db_error)?;

                        ledger::record_transaction(
                            txn,
                            AuditEntry::new(
                                line.inventory_item_id,
                                warehouse_id,
                                TransactionType::Reservation,
                                line.quantity,
                            )
                            .with_reference(
                                txn_reference_id.clone(),
                                Some(txn_reference_type.clone()),
                            )
                            .with_notes(Some(format!("Reservation {}", reservation.id)))
                            .with_created_by(created_by.clone()),
                        )
                        .await;

                        slots[index] = Some(reservation);
                    }

                    let reservations: Vec<inventory_reservation::Model> =
                        slots.into_iter().flatten().collect();
                    Ok((reservations, low_stock))
                })
            },
        )
        .await?;

        let total_quantity: i32 = reservations.iter().map(|r| r.quantity).sum();
        counter!("inventory.reservations.created", reservations.len() as u64);

        info!(
            reservations = reservations.len(),
            total_quantity,
            expiration_time = %expiration_time,
            "Inventory reserved"
        );

        self.event_sender.publish(Event::InventoryReserved {
            reference_id: reference_id.unwrap_or_default(),
            reference_type,
            reservation_ids: reservations.iter().map(|r| r.id).collect(),
            total_quantity,
            expires_at: expiration_time,
        });
        for item in &low_stock {
            self.event_sender.publish(low_stock_event(item));
        }

        Ok(ReserveInventoryResult {
            reservations,
            expiration_time,
        })
    }

    /// Turns a pending, unexpired hold into a sale: the held units leave stock.
    #[instrument(skip(self, ctx))]
    pub async fn confirm_reservation(
        &self,
        ctx: &CallContext,
        reservation_id: Uuid,
    ) -> Result<inventory_reservation::Model, ServiceError> {
        let reservation = db::transaction(
            self.db_pool.as_ref(),
            "confirm_reservation",
            ctx,
            move |txn| {
                Box::pin(async move {
                    let now = Utc::now();
                    if !transition_from_pending(txn, reservation_id, ReservationStatus::Confirmed, now)
                        .await?
                    {
                        return Err(classify_unchanged(txn, reservation_id, true).await);
                    }

                    let reservation = load_reservation(txn, reservation_id).await?;
                    let delta = QuantityDelta::consume(reservation.quantity);
                    ledger::apply_to_item(txn, reservation.inventory_item_id, delta).await?;
                    if let Some(warehouse_id) = reservation.warehouse_id {
                        ledger::apply_to_location(
                            txn,
                            reservation.inventory_item_id,
                            warehouse_id,
                            delta,
                        )
                        .await?;
                    }

                    ledger::record_transaction(
                        txn,
                        AuditEntry::new(
                            reservation.inventory_item_id,
                            reservation.warehouse_id,
                            TransactionType::StockRemoval,
                            reservation.quantity,
                        )
                        .with_reference(
                            Some(reservation.id.to_string()),
                            Some(RESERVATION_REFERENCE_TYPE.to_string()),
                        )
                        .with_notes(Some("Reservation confirmed".to_string())),
                    )
                    .await;

                    Ok(reservation)
                })
            },
        )
        .await?;

        counter!("inventory.reservations.confirmed", 1);
        info!(
            reservation_id = %reservation.id,
            inventory_item_id = %reservation.inventory_item_id,
            quantity = reservation.quantity,
            "Reservation confirmed"
        );

        self.event_sender.publish(Event::ReservationConfirmed {
            reservation_id: reservation.id,
            inventory_item_id: reservation.inventory_item_id,
            quantity: reservation.quantity,
        });

        Ok(reservation)
    }

    /// Releases a pending hold back to available stock. Expiry is not checked.
    #[instrument(skip(self, ctx))]
    pub async fn cancel_reservation(
        &self,
        ctx: &CallContext,
        reservation_id: Uuid,
    ) -> Result<inventory_reservation::Model, ServiceError> {
        let reservation = db::transaction(
            self.db_pool.as_ref(),
            "cancel_reservation",
            ctx,
            move |txn| {
                Box::pin(async move {
                    match release_pending(txn, reservation_id, Utc::now(), "Reservation cancelled")
                        .await?
                    {
                        ReleaseOutcome::Released(reservation) => Ok(reservation),
                        ReleaseOutcome::AlreadyResolved(reservation) => {
                            Err(ServiceError::ReservationInvalidState {
                                id: reservation.id,
                                status: reservation.status.to_string(),
                            })
                        }
                    }
                })
            },
        )
        .await?;

        counter!("inventory.reservations.cancelled", 1);
        info!(
            reservation_id = %reservation.id,
            inventory_item_id = %reservation.inventory_item_id,
            quantity = reservation.quantity,
            "Reservation cancelled"
        );

        self.event_sender.publish(Event::ReservationCancelled {
            reservation_id: reservation.id,
            inventory_item_id: reservation.inventory_item_id,
            quantity: reservation.quantity,
            expired: false,
        });

        Ok(reservation)
    }

    /// Cancels every pending reservation whose expiration time has passed.
    ///
    /// Each reservation is released in its own transaction. Rows that a
    /// concurrent confirm or cancel resolved first are skipped, and a row whose
    /// release failed is not retried within the same run. Safe to run
    /// repeatedly and from several processes at once.
    ///
    /// When `ctx` ends part-way through, the run stops between reservations
    /// and reports what it already committed.
    #[instrument(skip(self, ctx))]
    pub async fn clean_expired_reservations(
        &self,
        ctx: &CallContext,
    ) -> Result<CleanupResult, ServiceError> {
        let db = self.db_pool.as_ref();
        let now = Utc::now();
        let mut result = CleanupResult {
            expired_count: 0,
            skipped_count: 0,
            failed_count: 0,
            cleaned_at: now,
        };
        let mut failed: Vec<Uuid> = Vec::new();

        'sweep: loop {
            let mut query = InventoryReservationEntity::find()
                .filter(inventory_reservation::Column::Status.eq(ReservationStatus::Pending.as_str()))
                .filter(inventory_reservation::Column::ExpirationTime.lt(now));
            if !failed.is_empty() {
                query = query.filter(inventory_reservation::Column::Id.is_not_in(failed.clone()));
            }
            let fetch = query
                .order_by_asc(inventory_reservation::Column::ExpirationTime)
                .limit(self.sweep_batch_size)
                .all(db);

            let batch = match ctx
                .run(async { fetch.await.map_err(ServiceError::db_error) })
                .await
            {
                Ok(batch) => batch,
                Err(ServiceError::Cancelled | ServiceError::DeadlineExceeded)
                    if result.processed() > 0 =>
                {
                    break 'sweep;
                }
                Err(e) => return Err(e),
            };
            let batch_len = batch.len() as u64;

            for reservation in batch {
                let id = reservation.id;
                let outcome = db::transaction(db, "expire_reservation", ctx, move |txn| {
                    Box::pin(release_pending(txn, id, now, "Reservation expired"))
                })
                .await;

                match outcome {
                    Ok(ReleaseOutcome::Released(released)) => {
                        result.expired_count += 1;
                        debug!(
                            reservation_id = %released.id,
                            inventory_item_id = %released.inventory_item_id,
                            quantity = released.quantity,
                            "Released expired reservation"
                        );
                        self.event_sender.publish(Event::ReservationCancelled {
                            reservation_id: released.id,
                            inventory_item_id: released.inventory_item_id,
                            quantity: released.quantity,
                            expired: true,
                        });
                    }
                    Ok(ReleaseOutcome::AlreadyResolved(_))
                    | Err(ServiceError::ReservationNotFound(_)) => {
                        result.skipped_count += 1;
                    }
                    Err(ServiceError::Cancelled | ServiceError::DeadlineExceeded) => {
                        info!(
                            expired_count = result.expired_count,
                            "Expired reservation cleanup interrupted; the rest is left for the next run"
                        );
                        break 'sweep;
                    }
                    Err(e) => {
                        result.failed_count += 1;
                        failed.push(id);
                        warn!(
                            reservation_id = %id,
                            error = %e,
                            "Failed to release expired reservation"
                        );
                    }
                }
            }

            if batch_len < self.sweep_batch_size {
                break;
            }
        }

        counter!("inventory.reservations.expired", result.expired_count);

        if result.expired_count > 0 {
            info!(
                expired_count = result.expired_count,
                skipped_count = result.skipped_count,
                failed_count = result.failed_count,
                "Completed expired reservation cleanup"
            );
            self.event_sender.publish(Event::ReservationsExpired {
                count: result.expired_count,
                swept_at: now,
            });
        } else {
            debug!(
                skipped_count = result.skipped_count,
                failed_count = result.failed_count,
                "No expired reservations to release"
            );
        }

        Ok(result)
    }

    /// Gets a reservation by ID.
    #[instrument(skip(self))]
    pub async fn get_reservation(
        &self,
        reservation_id: Uuid,
    ) -> Result<ReservationSummary, ServiceError> {
        InventoryReservationEntity::find_by_id(reservation_id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .map(ReservationSummary::from)
            .ok_or(ServiceError::ReservationNotFound(reservation_id))
    }

    /// All reservations written for one external reference, oldest first.
    #[instrument(skip(self))]
    pub async fn list_reservations_by_reference(
        &self,
        reference_id: &str,
        reference_type: &str,
    ) -> Result<Vec<ReservationSummary>, ServiceError> {
        let reference_type = require_non_blank(reference_type, "reference_type")?;
        let reservations = InventoryReservationEntity::find()
            .filter(inventory_reservation::Column::ReferenceId.eq(reference_id.trim()))
            .filter(inventory_reservation::Column::ReferenceType.eq(reference_type))
            .order_by_asc(inventory_reservation::Column::CreatedAt)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(reservations.into_iter().map(ReservationSummary::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn reservation_stats(&self) -> Result<ReservationStats, ServiceError> {
        let db = self.db_pool.as_ref();
        let count = |status: ReservationStatus| {
            InventoryReservationEntity::find()
                .filter(inventory_reservation::Column::Status.eq(status.as_str()))
                .count(db)
        };

        let pending = count(ReservationStatus::Pending)
            .await
            .map_err(ServiceError::db_error)?;
        let confirmed = count(ReservationStatus::Confirmed)
            .await
            .map_err(ServiceError::db_error)?;
        let cancelled = count(ReservationStatus::Cancelled)
            .await
            .map_err(ServiceError::db_error)?;
        let pending_expired = InventoryReservationEntity::find()
            .filter(inventory_reservation::Column::Status.eq(ReservationStatus::Pending.as_str()))
            .filter(inventory_reservation::Column::ExpirationTime.lt(Utc::now()))
            .count(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(ReservationStats {
            pending,
            confirmed,
            cancelled,
            pending_expired,
        })
    }
}

/// Moves a reservation out of `PENDING`. Returns `false` when no row matched.
/// Confirmation additionally requires the reservation to be unexpired.
async fn transition_from_pending(
    txn: &DatabaseTransaction,
    reservation_id: Uuid,
    next: ReservationStatus,
    now: DateTime<Utc>,
) -> Result<bool, ServiceError> {
    let mut update = InventoryReservationEntity::update_many()
        .col_expr(inventory_reservation::Column::Status, Expr::value(next.as_str()))
        .col_expr(inventory_reservation::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_reservation::Column::Id.eq(reservation_id))
        .filter(inventory_reservation::Column::Status.eq(ReservationStatus::Pending.as_str()));

    if next == ReservationStatus::Confirmed {
        update = update.filter(inventory_reservation::Column::ExpirationTime.gte(now));
    }

    let result = update.exec(txn).await.map_err(ServiceError::db_error)?;
    Ok(result.rows_affected == 1)
}

/// Explains why a guarded transition matched nothing.
async fn classify_unchanged(
    txn: &DatabaseTransaction,
    reservation_id: Uuid,
    confirming: bool,
) -> ServiceError {
    match InventoryReservationEntity::find_by_id(reservation_id).one(txn).await {
        Err(e) => ServiceError::db_error(e),
        Ok(None) => ServiceError::ReservationNotFound(reservation_id),
        Ok(Some(reservation)) if reservation.status != ReservationStatus::Pending => {
            ServiceError::ReservationInvalidState {
                id: reservation_id,
                status: reservation.status.to_string(),
            }
        }
        Ok(Some(_)) if confirming => ServiceError::ReservationExpired(reservation_id),
        Ok(Some(reservation)) => ServiceError::ReservationInvalidState {
            id: reservation_id,
            status: reservation.status.to_string(),
        },
    }
}

async fn load_reservation(
    txn: &DatabaseTransaction,
    reservation_id: Uuid,
) -> Result<inventory_reservation::Model, ServiceError> {
    InventoryReservationEntity::find_by_id(reservation_id)
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or(ServiceError::ReservationNotFound(reservation_id))
}

/// Places a warehouse-less hold in the best location that can cover it.
/// Returns `None` when the item's stock was never placed in a warehouse; the
/// hold then lives on the item row alone.
async fn hold_in_preferred_location(
    txn: &DatabaseTransaction,
    item_id: Uuid,
    quantity: i32,
) -> Result<Option<Uuid>, ServiceError> {
    let candidates = ledger::covering_locations(txn, item_id, quantity).await?;
    if let Some(location) = candidates.first() {
        ledger::apply_to_location(txn, item_id, location.warehouse_id, QuantityDelta::reserve(quantity))
            .await?;
        return Ok(Some(location.warehouse_id));
    }

    if ledger::has_locations(txn, item_id).await? {
        return Err(ServiceError::InsufficientInventory(format!(
            "No active warehouse has {} units of item {} available",
            quantity, item_id
        )));
    }
    Ok(None)
}

/// Cancels a pending reservation and returns its units to available stock.
async fn release_pending(
    txn: &DatabaseTransaction,
    reservation_id: Uuid,
    now: DateTime<Utc>,
    reason: &'static str,
) -> Result<ReleaseOutcome, ServiceError> {
    if !transition_from_pending(txn, reservation_id, ReservationStatus::Cancelled, now).await? {
        let current = load_reservation(txn, reservation_id).await?;
        return Ok(ReleaseOutcome::AlreadyResolved(current));
    }

    let reservation = load_reservation(txn, reservation_id).await?;
    let delta = QuantityDelta::release(reservation.quantity);
    ledger::apply_to_item(txn, reservation.inventory_item_id, delta).await?;
    if let Some(warehouse_id) = reservation.warehouse_id {
        ledger::apply_to_location(txn, reservation.inventory_item_id, warehouse_id, delta).await?;
    }

    ledger::record_transaction(
        txn,
        AuditEntry::new(
            reservation.inventory_item_id,
            reservation.warehouse_id,
            TransactionType::ReservationRelease,
            reservation.quantity,
        )
        .with_reference(
            Some(reservation.id.to_string()),
            Some(RESERVATION_REFERENCE_TYPE.to_string()),
        )
        .with_notes(Some(reason.to_string())),
    )
    .await;

    Ok(ReleaseOutcome::Released(reservation))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(status: ReservationStatus, expires_in: Duration) -> inventory_reservation::Model {
        let now = Utc::now();
        inventory_reservation::Model {
            id: Uuid::new_v4(),
            inventory_item_id: Uuid::new_v4(),
            warehouse_id: None,
            quantity: 3,
            status,
            expiration_time: now + expires_in,
            reference_id: Some("order-7".into()),
            reference_type: "ORDER".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn summary_flags_only_pending_past_expiry() {
        let expired = ReservationSummary::from(reservation(
            ReservationStatus::Pending,
            Duration::minutes(-5),
        ));
        assert!(expired.is_expired);

        let live = ReservationSummary::from(reservation(
            ReservationStatus::Pending,
            Duration::minutes(5),
        ));
        assert!(!live.is_expired);

        let settled = ReservationSummary::from(reservation(
            ReservationStatus::Confirmed,
            Duration::minutes(-5),
        ));
        assert!(!settled.is_expired);
    }
}
