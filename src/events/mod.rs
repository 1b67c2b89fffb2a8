use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use metrics::counter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::inventory_item::InventoryStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender together with the receiving end of a bounded channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes an event after the state change it describes has committed.
    /// Never waits: a full or closed channel drops the event with a warning.
    pub fn publish(&self, event: Event) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                counter!("inventory.events.dropped", 1);
                warn!(?event, "Event channel full; dropping inventory event");
            }
            Err(TrySendError::Closed(event)) => {
                counter!("inventory.events.dropped", 1);
                warn!(?event, "Event channel closed; dropping inventory event");
            }
        }
    }
}

/// Domain events emitted by the engine after each committed change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    StockAdded {
        inventory_item_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        reference_id: Option<String>,
    },
    StockRemoved {
        inventory_item_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        reference_id: Option<String>,
    },
    InventoryReserved {
        reference_id: String,
        reference_type: String,
        reservation_ids: Vec<Uuid>,
        total_quantity: i32,
        expires_at: DateTime<Utc>,
    },
    ReservationConfirmed {
        reservation_id: Uuid,
        inventory_item_id: Uuid,
        quantity: i32,
    },
    ReservationCancelled {
        reservation_id: Uuid,
        inventory_item_id: Uuid,
        quantity: i32,
        expired: bool,
    },
    ReservationsExpired {
        count: u64,
        swept_at: DateTime<Utc>,
    },
    LowStockDetected {
        inventory_item_id: Uuid,
        sku: String,
        available_quantity: i32,
        reorder_point: i32,
        status: InventoryStatus,
    },
}

/// Consumes the event stream, logging each event. Runs until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                sku,
                available_quantity,
                reorder_point,
                status,
                ..
            } => {
                warn!(
                    sku = %sku,
                    available_quantity,
                    reorder_point,
                    status = %status,
                    "Inventory at or below reorder point"
                );
            }
            Event::ReservationsExpired { count, .. } => {
                info!(count, "Expired reservations released");
            }
            _ => {
                info!(?event, "Inventory event");
            }
        }
    }

    warn!("Event processing loop has ended");
}
