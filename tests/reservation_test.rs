mod common;

use assert_matches::assert_matches;
use common::TestEngine;
use inventory_engine::entities::inventory_reservation::{self, ReservationStatus};
use inventory_engine::entities::inventory_transaction::TransactionType;
use inventory_engine::services::reservations::{ReservationLine, ReserveInventoryRequest};
use inventory_engine::services::warehouses::UpdateWarehouseInput;
use inventory_engine::ServiceError;
use uuid::Uuid;

fn request(lines: Vec<ReservationLine>) -> ReserveInventoryRequest {
    ReserveInventoryRequest {
        items: lines,
        reference_id: "ORDER-42".into(),
        reference_type: "ORDER".into(),
        expiration_minutes: 15,
        created_by: Some("checkout".into()),
    }
}

fn line(item_id: Uuid, quantity: i32, warehouse_id: Option<Uuid>) -> ReservationLine {
    ReservationLine {
        inventory_item_id: item_id,
        quantity,
        warehouse_id,
    }
}

#[tokio::test]
async fn reserving_more_than_available_changes_nothing() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-50", 50, 0).await;

    let result = t
        .engine
        .reserve_inventory(&t.ctx, request(vec![line(item.id, 100, None)]))
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientInventory(_)));

    let item = t.fetch_item(item.id).await;
    assert_eq!(item.available_quantity, 50);
    assert_eq!(item.reserved_quantity, 0);
    assert_eq!(t.reservation_count().await, 0);
}

#[tokio::test]
async fn reserve_then_cancel_restores_available() {
    let t = TestEngine::new().await;
    let wh = t.warehouse("PICK").await;
    let created = t.item_in("SKU-RC", wh.id, 50, 0).await;
    let item_id = created.item.id;

    let reserved = t
        .engine
        .reserve_inventory(&t.ctx, request(vec![line(item_id, 10, Some(wh.id))]))
        .await
        .unwrap();
    assert_eq!(reserved.reservations.len(), 1);
    let reservation = &reserved.reservations[0];
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.expiration_time, reserved.expiration_time);
    assert_eq!(reservation.reference_id.as_deref(), Some("ORDER-42"));

    let item = t.fetch_item(item_id).await;
    assert_eq!((item.available_quantity, item.reserved_quantity), (40, 10));
    let location = t.fetch_location(item_id, wh.id).await.unwrap();
    assert_eq!((location.available_quantity, location.reserved_quantity), (40, 10));

    let cancelled = t
        .engine
        .cancel_reservation(&t.ctx, reservation.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);

    let item = t.fetch_item(item_id).await;
    assert_eq!((item.available_quantity, item.reserved_quantity), (50, 0));
    let location = t.fetch_location(item_id, wh.id).await.unwrap();
    assert_eq!((location.available_quantity, location.reserved_quantity), (50, 0));

    let kinds: Vec<_> = t
        .audit_trail(item_id)
        .await
        .into_iter()
        .map(|r| r.transaction_type)
        .collect();
    assert!(kinds.contains(&TransactionType::Reservation));
    assert!(kinds.contains(&TransactionType::ReservationRelease));
}

#[tokio::test]
async fn confirm_consumes_held_stock() {
    let t = TestEngine::new().await;
    let wh = t.warehouse("SHIP").await;
    let created = t.item_in("SKU-CONF", wh.id, 20, 0).await;
    let item_id = created.item.id;

    let reserved = t
        .engine
        .reserve_inventory(&t.ctx, request(vec![line(item_id, 6, Some(wh.id))]))
        .await
        .unwrap();
    let confirmed = t
        .engine
        .confirm_reservation(&t.ctx, reserved.reservations[0].id)
        .await
        .unwrap();
    assert_eq!(confirmed.status, ReservationStatus::Confirmed);

    let item = t.fetch_item(item_id).await;
    assert_eq!(
        (item.total_quantity, item.available_quantity, item.reserved_quantity),
        (14, 14, 0)
    );
    let location = t.fetch_location(item_id, wh.id).await.unwrap();
    assert_eq!(
        (location.quantity, location.available_quantity, location.reserved_quantity),
        (14, 14, 0)
    );

    let last = t.audit_trail(item_id).await.pop().unwrap();
    assert_eq!(last.transaction_type, TransactionType::StockRemoval);
    assert_eq!(last.reference_type.as_deref(), Some("RESERVATION"));
    assert_eq!(last.reference_id, Some(confirmed.id.to_string()));
}

#[tokio::test]
async fn resolved_reservations_reject_further_transitions() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-SM", 10, 0).await;

    let first = t
        .engine
        .reserve_inventory(&t.ctx, request(vec![line(item.id, 2, None)]))
        .await
        .unwrap()
        .reservations[0]
        .id;
    t.engine.confirm_reservation(&t.ctx, first).await.unwrap();

    assert_matches!(
        t.engine.confirm_reservation(&t.ctx, first).await,
        Err(ServiceError::ReservationInvalidState { id, status }) if id == first && status == "CONFIRMED"
    );
    assert_matches!(
        t.engine.cancel_reservation(&t.ctx, first).await,
        Err(ServiceError::ReservationInvalidState { .. })
    );

    let second = t
        .engine
        .reserve_inventory(&t.ctx, request(vec![line(item.id, 2, None)]))
        .await
        .unwrap()
        .reservations[0]
        .id;
    t.engine.cancel_reservation(&t.ctx, second).await.unwrap();
    assert_matches!(
        t.engine.confirm_reservation(&t.ctx, second).await,
        Err(ServiceError::ReservationInvalidState { .. })
    );
    assert_matches!(
        t.engine.cancel_reservation(&t.ctx, second).await,
        Err(ServiceError::ReservationInvalidState { .. })
    );

    let missing = Uuid::new_v4();
    assert_matches!(
        t.engine.confirm_reservation(&t.ctx, missing).await,
        Err(ServiceError::ReservationNotFound(id)) if id == missing
    );
    assert_matches!(
        t.engine.cancel_reservation(&t.ctx, missing).await,
        Err(ServiceError::ReservationNotFound(_))
    );

    t.assert_balanced(item.id).await;
}

#[tokio::test]
async fn expired_reservation_cannot_be_confirmed_but_can_be_cancelled() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-EXP", 10, 0).await;

    let id = t
        .engine
        .reserve_inventory(&t.ctx, request(vec![line(item.id, 4, None)]))
        .await
        .unwrap()
        .reservations[0]
        .id;
    t.backdate_reservation(id).await;

    assert_matches!(
        t.engine.confirm_reservation(&t.ctx, id).await,
        Err(ServiceError::ReservationExpired(expired)) if expired == id
    );
    // The failed confirm left everything untouched.
    assert_eq!(t.fetch_reservation(id).await.status, ReservationStatus::Pending);
    assert_eq!(t.fetch_item(item.id).await.reserved_quantity, 4);

    t.engine.cancel_reservation(&t.ctx, id).await.unwrap();
    assert_eq!(t.fetch_item(item.id).await.available_quantity, 10);
}

#[tokio::test]
async fn failing_line_rolls_back_the_whole_batch() {
    let t = TestEngine::new().await;
    let plenty = t.item("SKU-PLENTY", 100, 0).await;
    let scarce = t.item("SKU-SCARCE", 1, 0).await;

    let result = t
        .engine
        .reserve_inventory(
            &t.ctx,
            request(vec![line(plenty.id, 10, None), line(scarce.id, 5, None)]),
        )
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientInventory(_)));

    assert_eq!(t.reservation_count().await, 0);
    assert_eq!(t.fetch_item(plenty.id).await.available_quantity, 100);
    assert_eq!(t.fetch_item(scarce.id).await.available_quantity, 1);
}

#[tokio::test]
async fn batch_reservations_share_expiry_and_keep_request_order() {
    let t = TestEngine::new().await;
    let a = t.item("SKU-A", 10, 0).await;
    let b = t.item("SKU-B", 10, 0).await;

    let result = t
        .engine
        .reserve_inventory(
            &t.ctx,
            request(vec![line(b.id, 2, None), line(a.id, 3, None), line(b.id, 1, None)]),
        )
        .await
        .unwrap();

    let items: Vec<_> = result.reservations.iter().map(|r| (r.inventory_item_id, r.quantity)).collect();
    assert_eq!(items, vec![(b.id, 2), (a.id, 3), (b.id, 1)]);
    assert!(result
        .reservations
        .iter()
        .all(|r| r.expiration_time == result.expiration_time));
    assert_eq!(t.fetch_item(b.id).await.reserved_quantity, 3);

    let listed = t
        .engine
        .list_reservations_by_reference(&t.ctx, "ORDER-42", "ORDER")
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
}

#[tokio::test]
async fn request_validation() {
    let t = TestEngine::new().await;
    let wh = t.warehouse_with("SHUT", false, 0).await;
    let item = t.item("SKU-V", 5, 0).await;

    assert_matches!(
        t.engine.reserve_inventory(&t.ctx, request(vec![])).await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        t.engine
            .reserve_inventory(&t.ctx, request(vec![line(item.id, 0, None)]))
            .await,
        Err(ServiceError::InvalidQuantity(_))
    );
    assert_matches!(
        t.engine
            .reserve_inventory(
                &t.ctx,
                ReserveInventoryRequest {
                    reference_type: " ".into(),
                    ..request(vec![line(item.id, 1, None)])
                }
            )
            .await,
        Err(ServiceError::InvalidInput(_))
    );
    assert_matches!(
        t.engine
            .reserve_inventory(&t.ctx, request(vec![line(Uuid::new_v4(), 1, None)]))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        t.engine
            .reserve_inventory(&t.ctx, request(vec![line(item.id, 1, Some(Uuid::new_v4()))]))
            .await,
        Err(ServiceError::WarehouseNotFound(_))
    );
    assert_matches!(
        t.engine
            .reserve_inventory(&t.ctx, request(vec![line(item.id, 1, Some(wh.id))]))
            .await,
        Err(ServiceError::WarehouseInactive(_))
    );
}

#[tokio::test]
async fn non_positive_expiration_uses_configured_default() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-TTL", 5, 0).await;

    let before = chrono::Utc::now();
    let result = t
        .engine
        .reserve_inventory(
            &t.ctx,
            ReserveInventoryRequest {
                expiration_minutes: 0,
                ..request(vec![line(item.id, 1, None)])
            },
        )
        .await
        .unwrap();

    let ttl = result.expiration_time - before;
    let default = chrono::Duration::minutes(t.config.reservation_default_expiration_minutes);
    assert!(ttl >= default);
    assert!(ttl < default + chrono::Duration::minutes(1));
}

#[tokio::test]
async fn lookup_and_stats() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-STATS", 10, 0).await;

    let ids: Vec<Uuid> = t
        .engine
        .reserve_inventory(
            &t.ctx,
            request(vec![
                line(item.id, 1, None),
                line(item.id, 1, None),
                line(item.id, 1, None),
            ]),
        )
        .await
        .unwrap()
        .reservations
        .iter()
        .map(|r| r.id)
        .collect();

    t.engine.confirm_reservation(&t.ctx, ids[0]).await.unwrap();
    t.engine.cancel_reservation(&t.ctx, ids[1]).await.unwrap();
    t.backdate_reservation(ids[2]).await;

    let summary = t.engine.get_reservation(&t.ctx, ids[2]).await.unwrap();
    assert!(summary.is_expired);
    assert_eq!(summary.status, ReservationStatus::Pending);

    let stats = t.engine.reservation_stats(&t.ctx).await.unwrap();
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.confirmed, 1);
    assert_eq!(stats.cancelled, 1);
    assert_eq!(stats.pending_expired, 1);

    assert_matches!(
        t.engine.get_reservation(&t.ctx, Uuid::new_v4()).await,
        Err(ServiceError::ReservationNotFound(_))
    );
}

async fn reserve_one(
    t: &TestEngine,
    item_id: Uuid,
    quantity: i32,
) -> Result<inventory_reservation::Model, ServiceError> {
    t.engine
        .reserve_inventory(&t.ctx, request(vec![line(item_id, quantity, None)]))
        .await
        .map(|mut result| result.reservations.remove(0))
}

#[tokio::test]
async fn warehouse_less_lines_draw_from_the_highest_priority_warehouse() {
    let t = TestEngine::new().await;
    let low = t.warehouse_with("LOW", true, 1).await;
    let high = t.warehouse_with("HIGH", true, 5).await;
    let item_id = t.item_in("SKU-PRIO", low.id, 10, 0).await.item.id;
    t.engine
        .add_inventory_to_location(&t.ctx, t.allocation(item_id, high.id, 10))
        .await
        .unwrap();

    let first = reserve_one(&t, item_id, 6).await.unwrap();
    assert_eq!(first.warehouse_id, Some(high.id));
    let location = t.fetch_location(item_id, high.id).await.unwrap();
    assert_eq!((location.available_quantity, location.reserved_quantity), (4, 6));

    // HIGH can no longer cover 6, so LOW is next.
    let second = reserve_one(&t, item_id, 6).await.unwrap();
    assert_eq!(second.warehouse_id, Some(low.id));

    // 8 units are available in total but no single warehouse holds 5.
    assert_matches!(
        reserve_one(&t, item_id, 5).await,
        Err(ServiceError::InsufficientInventory(_))
    );
    let item = t.fetch_item(item_id).await;
    assert_eq!(
        (item.total_quantity, item.available_quantity, item.reserved_quantity),
        (20, 8, 12)
    );
    assert_eq!(t.reservation_count().await, 2);
    t.assert_reconciled(item_id).await;
}

#[tokio::test]
async fn inactive_warehouses_are_never_chosen() {
    let t = TestEngine::new().await;
    let primary = t.warehouse_with("PRIMARY", true, 10).await;
    let backup = t.warehouse_with("BACKUP", true, 1).await;
    let item_id = t.item_in("SKU-BACKUP", primary.id, 5, 0).await.item.id;
    t.engine
        .add_inventory_to_location(&t.ctx, t.allocation(item_id, backup.id, 5))
        .await
        .unwrap();
    t.engine
        .update_warehouse(
            &t.ctx,
            primary.id,
            UpdateWarehouseInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reservation = reserve_one(&t, item_id, 3).await.unwrap();
    assert_eq!(reservation.warehouse_id, Some(backup.id));
    assert_matches!(
        reserve_one(&t, item_id, 3).await,
        Err(ServiceError::InsufficientInventory(_))
    );
    t.assert_reconciled(item_id).await;
}

#[tokio::test]
async fn resolving_warehouse_less_holds_keeps_locations_reconciled() {
    let t = TestEngine::new().await;
    let wh = t.warehouse("W1").await;
    let item_id = t.item_in("SKU-RECON", wh.id, 10, 0).await.item.id;

    let cancelled = reserve_one(&t, item_id, 4).await.unwrap();
    t.engine.cancel_reservation(&t.ctx, cancelled.id).await.unwrap();
    let location = t.fetch_location(item_id, wh.id).await.unwrap();
    assert_eq!((location.available_quantity, location.reserved_quantity), (10, 0));

    let confirmed = reserve_one(&t, item_id, 10).await.unwrap();
    t.engine.confirm_reservation(&t.ctx, confirmed.id).await.unwrap();

    let item = t.fetch_item(item_id).await;
    assert_eq!(item.total_quantity, 0);
    let location = t.fetch_location(item_id, wh.id).await.unwrap();
    assert_eq!(
        (location.quantity, location.available_quantity, location.reserved_quantity),
        (0, 0, 0)
    );
    t.assert_reconciled(item_id).await;

    // Nothing is left behind in the warehouse to remove.
    assert_matches!(
        t.engine
            .remove_inventory_from_location(&t.ctx, t.allocation(item_id, wh.id, 1))
            .await,
        Err(ServiceError::InsufficientInventory(_))
    );
}

#[tokio::test]
async fn unplaced_stock_is_held_at_item_level() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-LOOSE", 10, 0).await;

    let reservation = reserve_one(&t, item.id, 3).await.unwrap();
    assert_eq!(reservation.warehouse_id, None);
    t.engine.confirm_reservation(&t.ctx, reservation.id).await.unwrap();

    let item = t.fetch_item(item.id).await;
    assert_eq!(
        (item.total_quantity, item.available_quantity, item.reserved_quantity),
        (7, 7, 0)
    );
}
