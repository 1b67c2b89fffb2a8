mod common;

use std::time::Duration;

use common::TestEngine;
use inventory_engine::entities::inventory_reservation::{self, ReservationStatus};
use inventory_engine::services::reservations::{ReservationLine, ReserveInventoryRequest};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

async fn reserve(t: &TestEngine, item_id: Uuid, warehouse_id: Option<Uuid>, quantity: i32) -> Uuid {
    t.engine
        .reserve_inventory(
            &t.ctx,
            ReserveInventoryRequest {
                items: vec![ReservationLine {
                    inventory_item_id: item_id,
                    quantity,
                    warehouse_id,
                }],
                reference_id: format!("ORDER-{}", Uuid::new_v4()),
                reference_type: "ORDER".into(),
                expiration_minutes: 30,
                created_by: None,
            },
        )
        .await
        .expect("reserve")
        .reservations[0]
        .id
}

#[tokio::test]
async fn sweep_releases_only_expired_pending_reservations() {
    let t = TestEngine::new().await;
    let wh = t.warehouse("SWEEP").await;
    let created = t.item_in("SKU-SWEEP", wh.id, 20, 0).await;
    let item_id = created.item.id;

    let stale = reserve(&t, item_id, Some(wh.id), 5).await;
    let fresh = reserve(&t, item_id, Some(wh.id), 3).await;
    let confirmed = reserve(&t, item_id, None, 2).await;
    t.engine.confirm_reservation(&t.ctx, confirmed).await.unwrap();
    t.backdate_reservation(stale).await;
    t.backdate_reservation(confirmed).await;

    let result = t.engine.clean_expired_reservations(&t.ctx).await.unwrap();
    assert_eq!(result.expired_count, 1);
    assert_eq!(result.failed_count, 0);

    assert_eq!(t.fetch_reservation(stale).await.status, ReservationStatus::Cancelled);
    assert_eq!(t.fetch_reservation(fresh).await.status, ReservationStatus::Pending);
    assert_eq!(t.fetch_reservation(confirmed).await.status, ReservationStatus::Confirmed);

    let item = t.fetch_item(item_id).await;
    assert_eq!(
        (item.total_quantity, item.available_quantity, item.reserved_quantity),
        (18, 15, 3)
    );
    // The warehouse-less hold was placed in the only warehouse holding stock.
    let location = t.fetch_location(item_id, wh.id).await.unwrap();
    assert_eq!(
        (location.quantity, location.available_quantity, location.reserved_quantity),
        (18, 15, 3)
    );
    t.assert_balanced(item_id).await;
    t.assert_reconciled(item_id).await;
}

#[tokio::test]
async fn sweep_is_idempotent() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-IDEM", 10, 0).await;
    let id = reserve(&t, item.id, None, 4).await;
    t.backdate_reservation(id).await;

    let first = t.engine.clean_expired_reservations(&t.ctx).await.unwrap();
    let second = t.engine.clean_expired_reservations(&t.ctx).await.unwrap();
    assert_eq!(first.expired_count, 1);
    assert_eq!(second.expired_count, 0);

    let item = t.fetch_item(item.id).await;
    assert_eq!((item.available_quantity, item.reserved_quantity), (10, 0));
}

#[tokio::test]
async fn sweep_walks_every_batch() {
    let mut config = common::test_config();
    config.reaper_batch_size = 2;
    let t = TestEngine::with_config(config).await;
    let item = t.item("SKU-BATCH", 50, 0).await;

    for _ in 0..5 {
        let id = reserve(&t, item.id, None, 1).await;
        t.backdate_reservation(id).await;
    }

    let result = t.engine.clean_expired_reservations(&t.ctx).await.unwrap();
    assert_eq!(result.expired_count, 5);
    assert_eq!(t.fetch_item(item.id).await.available_quantity, 50);
}

#[tokio::test]
async fn a_failing_release_is_counted_once_per_sweep() {
    let mut config = common::test_config();
    config.reaper_batch_size = 2;
    let t = TestEngine::with_config(config).await;
    let item = t.item("SKU-STUCK", 10, 0).await;

    let stuck = reserve(&t, item.id, None, 1).await;
    t.backdate_reservation(stuck).await;
    // Claims more units than the item holds in reserve, so releasing it fails.
    let mut active: inventory_reservation::ActiveModel = t.fetch_reservation(stuck).await.into();
    active.quantity = Set(50);
    active.update(t.db.as_ref()).await.expect("inflate reservation");

    for _ in 0..2 {
        let id = reserve(&t, item.id, None, 1).await;
        t.backdate_reservation(id).await;
    }

    let result = t.engine.clean_expired_reservations(&t.ctx).await.unwrap();
    assert_eq!(result.expired_count, 2);
    assert_eq!(result.failed_count, 1);
    assert_eq!(t.fetch_reservation(stuck).await.status, ReservationStatus::Pending);

    let item = t.fetch_item(item.id).await;
    assert_eq!((item.available_quantity, item.reserved_quantity), (9, 1));
}

#[tokio::test]
async fn background_reaper_sweeps_and_shuts_down() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-BG", 10, 0).await;
    let id = reserve(&t, item.id, None, 6).await;
    t.backdate_reservation(id).await;

    let handle = t.engine.expiration_reaper().spawn();

    let mut released = false;
    for _ in 0..50 {
        if t.fetch_reservation(id).await.status == ReservationStatus::Cancelled {
            released = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(released, "reaper never released the expired reservation");

    handle.shutdown().await;
    assert_eq!(t.fetch_item(item.id).await.available_quantity, 10);
}

#[tokio::test]
async fn reaper_stops_when_its_token_is_cancelled() {
    let t = TestEngine::new().await;
    let handle = t.engine.expiration_reaper().spawn();
    handle.cancellation_token().cancel();

    for _ in 0..50 {
        if handle.is_finished() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(handle.is_finished());
    handle.shutdown().await;
}
