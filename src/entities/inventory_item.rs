use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stock status derived from available quantity and the reorder point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    #[sea_orm(string_value = "IN_STOCK")]
    InStock,

    #[sea_orm(string_value = "LOW_STOCK")]
    LowStock,

    #[sea_orm(string_value = "OUT_OF_STOCK")]
    OutOfStock,
}

impl InventoryStatus {
    /// `available <= 0` is out of stock, `0 < available <= reorder_point` is
    /// low stock, anything above the reorder point is in stock.
    pub fn determine(available_quantity: i32, reorder_point: i32) -> Self {
        if available_quantity <= 0 {
            InventoryStatus::OutOfStock
        } else if available_quantity <= reorder_point {
            InventoryStatus::LowStock
        } else {
            InventoryStatus::InStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::InStock => "IN_STOCK",
            InventoryStatus::LowStock => "LOW_STOCK",
            InventoryStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

impl fmt::Display for InventoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub sku: String,
    pub total_quantity: i32,
    pub available_quantity: i32,
    pub reserved_quantity: i32,
    pub reorder_point: i32,
    pub reorder_quantity: i32,
    pub status: InventoryStatus,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// `total == available + reserved` with every component non-negative.
    pub fn is_balanced(&self) -> bool {
        self.total_quantity >= 0
            && self.available_quantity >= 0
            && self.reserved_quantity >= 0
            && self.total_quantity == self.available_quantity + self.reserved_quantity
    }

    pub fn is_low_stock(&self) -> bool {
        self.available_quantity <= self.reorder_point
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_location::Entity")]
    InventoryLocations,
    #[sea_orm(has_many = "super::inventory_reservation::Entity")]
    InventoryReservations,
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    InventoryTransactions,
}

impl Related<super::inventory_location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryLocations.def()
    }
}

impl Related<super::inventory_reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryReservations.def()
    }
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransactions.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);
            active_model.last_updated = Set(now);
            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_thresholds() {
        assert_eq!(InventoryStatus::determine(100, 10), InventoryStatus::InStock);
        assert_eq!(InventoryStatus::determine(11, 10), InventoryStatus::InStock);
        assert_eq!(InventoryStatus::determine(10, 10), InventoryStatus::LowStock);
        assert_eq!(InventoryStatus::determine(1, 10), InventoryStatus::LowStock);
        assert_eq!(InventoryStatus::determine(0, 10), InventoryStatus::OutOfStock);
        assert_eq!(InventoryStatus::determine(-3, 10), InventoryStatus::OutOfStock);
    }

    #[test]
    fn zero_reorder_point_never_reports_low_stock() {
        assert_eq!(InventoryStatus::determine(1, 0), InventoryStatus::InStock);
        assert_eq!(InventoryStatus::determine(0, 0), InventoryStatus::OutOfStock);
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&InventoryStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"OUT_OF_STOCK\"");
        assert_eq!(InventoryStatus::LowStock.to_string(), "LOW_STOCK");
    }
}
