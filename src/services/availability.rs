//! Read-only availability checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::inventory_items::{find_by_product, find_by_sku};
use crate::db::DbPool;
use crate::entities::inventory_item::{self, InventoryStatus};
use crate::errors::ServiceError;

/// How a caller names the item it wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemSelector {
    Sku(String),
    Product {
        product_id: Uuid,
        variant_id: Option<Uuid>,
    },
}

impl ItemSelector {
    /// Builds a selector from loose identifiers, preferring the SKU when both are present.
    pub fn from_parts(
        sku: Option<String>,
        product_id: Option<Uuid>,
        variant_id: Option<Uuid>,
    ) -> Option<Self> {
        match (sku.filter(|s| !s.trim().is_empty()), product_id) {
            (Some(sku), _) => Some(ItemSelector::Sku(sku)),
            (None, Some(product_id)) => Some(ItemSelector::Product {
                product_id,
                variant_id,
            }),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequestLine {
    pub selector: ItemSelector,
    pub quantity: i32,
}

/// Item status as seen by an availability check. `NotFound` marks selectors
/// that matched nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AvailabilityStatus {
    InStock,
    LowStock,
    OutOfStock,
    NotFound,
}

impl AvailabilityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityStatus::InStock => "IN_STOCK",
            AvailabilityStatus::LowStock => "LOW_STOCK",
            AvailabilityStatus::OutOfStock => "OUT_OF_STOCK",
            AvailabilityStatus::NotFound => "NOT_FOUND",
        }
    }
}

impl From<InventoryStatus> for AvailabilityStatus {
    fn from(status: InventoryStatus) -> Self {
        match status {
            InventoryStatus::InStock => AvailabilityStatus::InStock,
            InventoryStatus::LowStock => AvailabilityStatus::LowStock,
            InventoryStatus::OutOfStock => AvailabilityStatus::OutOfStock,
        }
    }
}

impl fmt::Display for AvailabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    pub selector: ItemSelector,
    pub inventory_item_id: Option<Uuid>,
    pub sku: Option<String>,
    pub requested_quantity: i32,
    pub available_quantity: i32,
    pub status: AvailabilityStatus,
    pub is_available: bool,
}

impl AvailabilityResult {
    fn not_found(line: AvailabilityRequestLine) -> Self {
        Self {
            selector: line.selector,
            inventory_item_id: None,
            sku: None,
            requested_quantity: line.quantity,
            available_quantity: 0,
            status: AvailabilityStatus::NotFound,
            is_available: false,
        }
    }

    fn found(line: AvailabilityRequestLine, item: inventory_item::Model) -> Self {
        Self {
            is_available: item.available_quantity >= line.quantity,
            selector: line.selector,
            inventory_item_id: Some(item.id),
            sku: Some(item.sku),
            requested_quantity: line.quantity,
            available_quantity: item.available_quantity,
            status: item.status.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    pub items: Vec<AvailabilityResult>,
    pub all_available: bool,
}

#[derive(Clone)]
pub struct AvailabilityService {
    db_pool: Arc<DbPool>,
}

impl AvailabilityService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Answers whether each requested quantity could be fulfilled right now.
    /// Unknown items are reported per line and never fail the batch.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn check_inventory_availability(
        &self,
        lines: Vec<AvailabilityRequestLine>,
    ) -> Result<AvailabilityReport, ServiceError> {
        if lines.is_empty() {
            return Err(ServiceError::InvalidInput(
                "At least one item is required".to_string(),
            ));
        }
        if let Some(line) = lines.iter().find(|line| line.quantity <= 0) {
            return Err(ServiceError::InvalidQuantity(format!(
                "Requested quantity for {:?} must be positive, got {}",
                line.selector, line.quantity
            )));
        }

        let db = self.db_pool.as_ref();
        let mut items = Vec::with_capacity(lines.len());

        for line in lines {
            let item = match &line.selector {
                ItemSelector::Sku(sku) => find_by_sku(db, sku.trim()).await?,
                ItemSelector::Product {
                    product_id,
                    variant_id,
                } => find_by_product(db, *product_id, *variant_id).await?,
            };

            let result = match item {
                Some(item) => AvailabilityResult::found(line, item),
                None => AvailabilityResult::not_found(line),
            };
            debug!(
                selector = ?result.selector,
                status = %result.status,
                is_available = result.is_available,
                "Availability resolved"
            );
            items.push(result);
        }

        let all_available = items.iter().all(|r| r.is_available);
        Ok(AvailabilityReport {
            items,
            all_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_prefers_sku() {
        let product_id = Uuid::new_v4();
        assert_eq!(
            ItemSelector::from_parts(Some("SKU-9".into()), Some(product_id), None),
            Some(ItemSelector::Sku("SKU-9".into()))
        );
        assert_eq!(
            ItemSelector::from_parts(Some("  ".into()), Some(product_id), None),
            Some(ItemSelector::Product {
                product_id,
                variant_id: None
            })
        );
        assert_eq!(ItemSelector::from_parts(None, None, None), None);
    }

    #[test]
    fn not_found_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&AvailabilityStatus::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
        assert_eq!(
            AvailabilityStatus::from(InventoryStatus::LowStock),
            AvailabilityStatus::LowStock
        );
    }
}
