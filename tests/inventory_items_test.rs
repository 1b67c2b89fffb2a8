mod common;

use assert_matches::assert_matches;
use common::TestEngine;
use inventory_engine::entities::inventory_item::InventoryStatus;
use inventory_engine::entities::inventory_transaction::TransactionType;
use inventory_engine::services::inventory_items::{
    CreateInventoryItemInput, InventoryItemLookup, ListInventoryItemsQuery, LocationSplit,
    UpdateInventoryItemInput,
};
use inventory_engine::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn new_item_starts_fully_available() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-100", 100, 10).await;

    assert_eq!(item.total_quantity, 100);
    assert_eq!(item.available_quantity, 100);
    assert_eq!(item.reserved_quantity, 0);
    assert_eq!(item.status, InventoryStatus::InStock);

    let trail = t.audit_trail(item.id).await;
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].transaction_type, TransactionType::StockAddition);
    assert_eq!(trail[0].quantity, 100);
}

#[tokio::test]
async fn status_follows_available_quantity() {
    let t = TestEngine::new().await;
    let wh = t.warehouse("MAIN").await;
    let created = t.item_in("SKU-STATUS", wh.id, 100, 10).await;
    let item_id = created.item.id;
    assert_eq!(created.item.status, InventoryStatus::InStock);

    let after = t
        .engine
        .remove_inventory_from_location(&t.ctx, t.allocation(item_id, wh.id, 95))
        .await
        .unwrap();
    assert_eq!(after.item.available_quantity, 5);
    assert_eq!(after.item.status, InventoryStatus::LowStock);

    let after = t
        .engine
        .remove_inventory_from_location(&t.ctx, t.allocation(item_id, wh.id, 5))
        .await
        .unwrap();
    assert_eq!(after.item.available_quantity, 0);
    assert_eq!(after.item.status, InventoryStatus::OutOfStock);

    t.assert_balanced(item_id).await;
}

#[tokio::test]
async fn initial_locations_are_created_with_the_item() {
    let t = TestEngine::new().await;
    let east = t.warehouse("EAST").await;
    let west = t.warehouse("WEST").await;

    let created = t
        .engine
        .create_inventory_item(
            &t.ctx,
            CreateInventoryItemInput {
                product_id: Uuid::new_v4(),
                sku: "SKU-SPLIT".into(),
                initial_quantity: 30,
                reorder_point: 5,
                reorder_quantity: 20,
                initial_locations: vec![
                    LocationSplit {
                        warehouse_id: east.id,
                        quantity: 18,
                    },
                    LocationSplit {
                        warehouse_id: west.id,
                        quantity: 12,
                    },
                ],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(created.locations.len(), 2);
    let east_row = t.fetch_location(created.item.id, east.id).await.unwrap();
    let west_row = t.fetch_location(created.item.id, west.id).await.unwrap();
    assert_eq!(east_row.available_quantity, 18);
    assert_eq!(west_row.available_quantity, 12);
    t.assert_balanced(created.item.id).await;
}

#[tokio::test]
async fn mismatched_split_creates_nothing() {
    let t = TestEngine::new().await;
    let wh = t.warehouse("ONLY").await;

    let result = t
        .engine
        .create_inventory_item(
            &t.ctx,
            CreateInventoryItemInput {
                product_id: Uuid::new_v4(),
                sku: "SKU-BAD-SPLIT".into(),
                initial_quantity: 30,
                initial_locations: vec![LocationSplit {
                    warehouse_id: wh.id,
                    quantity: 10,
                }],
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::InvalidInput(_)));

    let lookup = t
        .engine
        .get_inventory_item(&t.ctx, InventoryItemLookup::Sku("SKU-BAD-SPLIT".into()))
        .await;
    assert_matches!(lookup, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn split_into_inactive_warehouse_rolls_back() {
    let t = TestEngine::new().await;
    let closed = t.warehouse_with("CLOSED", false, 0).await;

    let result = t
        .engine
        .create_inventory_item(
            &t.ctx,
            CreateInventoryItemInput {
                product_id: Uuid::new_v4(),
                sku: "SKU-CLOSED".into(),
                initial_quantity: 4,
                initial_locations: vec![LocationSplit {
                    warehouse_id: closed.id,
                    quantity: 4,
                }],
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::WarehouseInactive(id)) if id == closed.id);

    let lookup = t
        .engine
        .get_inventory_item(&t.ctx, InventoryItemLookup::Sku("SKU-CLOSED".into()))
        .await;
    assert_matches!(lookup, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn duplicate_sku_and_bad_quantities_are_rejected() {
    let t = TestEngine::new().await;
    t.item("SKU-DUP", 1, 0).await;

    let duplicate = t
        .engine
        .create_inventory_item(
            &t.ctx,
            CreateInventoryItemInput {
                product_id: Uuid::new_v4(),
                sku: "SKU-DUP".into(),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(duplicate, Err(ServiceError::AlreadyExists(_)));

    let negative = t
        .engine
        .create_inventory_item(
            &t.ctx,
            CreateInventoryItemInput {
                product_id: Uuid::new_v4(),
                sku: "SKU-NEG".into(),
                initial_quantity: -1,
                ..Default::default()
            },
        )
        .await;
    assert_matches!(negative, Err(ServiceError::InvalidQuantity(_)));

    let blank = t
        .engine
        .create_inventory_item(
            &t.ctx,
            CreateInventoryItemInput {
                product_id: Uuid::new_v4(),
                sku: "  ".into(),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(blank, Err(ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn lookup_by_id_product_and_sku() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-LOOKUP", 3, 0).await;

    let by_id = t
        .engine
        .get_inventory_item(&t.ctx, InventoryItemLookup::Id(item.id))
        .await
        .unwrap();
    let by_sku = t
        .engine
        .get_inventory_item(&t.ctx, InventoryItemLookup::Sku("SKU-LOOKUP".into()))
        .await
        .unwrap();
    let by_product = t
        .engine
        .get_inventory_item(&t.ctx, InventoryItemLookup::ProductId(item.product_id))
        .await
        .unwrap();

    assert_eq!(by_id.id, item.id);
    assert_eq!(by_sku.id, item.id);
    assert_eq!(by_product.id, item.id);

    assert_matches!(
        t.engine
            .get_inventory_item(&t.ctx, InventoryItemLookup::Id(Uuid::new_v4()))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        t.engine
            .get_inventory_item(&t.ctx, InventoryItemLookup::Sku(" ".into()))
            .await,
        Err(ServiceError::InvalidInput(_))
    );
}

#[tokio::test]
async fn update_recomputes_or_overrides_status() {
    let t = TestEngine::new().await;
    let item = t.item("SKU-REORDER", 20, 5).await;
    assert_eq!(item.status, InventoryStatus::InStock);

    let raised = t
        .engine
        .update_inventory_item(
            &t.ctx,
            item.id,
            UpdateInventoryItemInput {
                reorder_point: Some(25),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(raised.reorder_point, 25);
    assert_eq!(raised.status, InventoryStatus::LowStock);
    assert_eq!(raised.available_quantity, 20);

    let forced = t
        .engine
        .update_inventory_item(
            &t.ctx,
            item.id,
            UpdateInventoryItemInput {
                status: Some(InventoryStatus::OutOfStock),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(forced.status, InventoryStatus::OutOfStock);

    let negative = t
        .engine
        .update_inventory_item(
            &t.ctx,
            item.id,
            UpdateInventoryItemInput {
                reorder_quantity: Some(-4),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(negative, Err(ServiceError::InvalidQuantity(_)));
}

#[tokio::test]
async fn list_filters_by_warehouse_status_and_low_stock() {
    let t = TestEngine::new().await;
    let north = t.warehouse("NORTH").await;
    let south = t.warehouse("SOUTH").await;

    let plenty = t.item_in("SKU-PLENTY", north.id, 100, 10).await;
    let scarce = t.item_in("SKU-SCARCE", south.id, 3, 10).await;
    let _empty = t.item("SKU-EMPTY", 0, 10).await;

    let query = |page, limit| ListInventoryItemsQuery {
        page,
        limit,
        ..Default::default()
    };

    let (all, total) = t.engine.list_inventory_items(&t.ctx, query(1, 10)).await.unwrap();
    assert_eq!(total, 3);
    let plenty_row = all.iter().find(|r| r.item.id == plenty.item.id).unwrap();
    assert_eq!(plenty_row.locations.len(), 1);
    assert_eq!(plenty_row.locations[0].warehouse_id, north.id);

    let (in_north, total) = t
        .engine
        .list_inventory_items(
            &t.ctx,
            ListInventoryItemsQuery {
                warehouse_id: Some(north.id),
                ..query(1, 10)
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(in_north[0].item.id, plenty.item.id);

    let (low, total) = t
        .engine
        .list_inventory_items(
            &t.ctx,
            ListInventoryItemsQuery {
                low_stock_only: true,
                ..query(1, 10)
            },
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(low.iter().all(|r| r.item.available_quantity <= r.item.reorder_point));

    let (low_status, _) = t
        .engine
        .list_inventory_items(
            &t.ctx,
            ListInventoryItemsQuery {
                status: Some(InventoryStatus::LowStock),
                ..query(1, 10)
            },
        )
        .await
        .unwrap();
    assert_eq!(low_status.len(), 1);
    assert_eq!(low_status[0].item.id, scarce.item.id);

    assert_matches!(
        t.engine.list_inventory_items(&t.ctx, query(0, 10)).await,
        Err(ServiceError::InvalidInput(_))
    );
}
