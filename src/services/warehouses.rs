//! Warehouse registry.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{require_non_blank, validate_pagination};
use crate::context::CallContext;
use crate::db::{self, DbPool};
use crate::entities::warehouse::{self, Entity as WarehouseEntity};
use crate::errors::ServiceError;

/// Ways to address a single warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarehouseLookup {
    Id(Uuid),
    Code(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateWarehouseInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    #[serde(default)]
    pub priority: i32,
    /// Defaults to active.
    pub is_active: Option<bool>,
}

/// Partial update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWarehouseInput {
    pub name: Option<String>,
    pub code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub priority: Option<i32>,
    pub is_active: Option<bool>,
}

/// Loads a warehouse by id on any connection, including an open transaction.
pub(crate) async fn fetch_warehouse<C>(conn: &C, id: Uuid) -> Result<warehouse::Model, ServiceError>
where
    C: ConnectionTrait,
{
    WarehouseEntity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::WarehouseNotFound(id.to_string()))
}

/// Loads a warehouse and rejects it when it no longer accepts new stock or holds.
pub(crate) async fn fetch_active_warehouse<C>(
    conn: &C,
    id: Uuid,
) -> Result<warehouse::Model, ServiceError>
where
    C: ConnectionTrait,
{
    let warehouse = fetch_warehouse(conn, id).await?;
    if !warehouse.is_active {
        return Err(ServiceError::WarehouseInactive(id));
    }
    Ok(warehouse)
}

#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
    max_page_size: u64,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>, max_page_size: u64) -> Self {
        Self {
            db_pool,
            max_page_size,
        }
    }

    #[instrument(skip(self, ctx, input), fields(code = %input.code))]
    pub async fn create_warehouse(
        &self,
        ctx: &CallContext,
        input: CreateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let name = require_non_blank(&input.name, "name")?;
        let code = require_non_blank(&input.code, "code")?;
        input
            .validate()
            .map_err(|e| ServiceError::InvalidInput(e.to_string()))?;

        let db = self.db_pool.as_ref();

        if self.find_by_code(&code).await?.is_some() {
            return Err(ServiceError::AlreadyExists(format!(
                "Warehouse code {} is already in use",
                code
            )));
        }

        let model = warehouse::ActiveModel {
            name: Set(name),
            code: Set(code.clone()),
            address: Set(input.address),
            city: Set(input.city),
            state: Set(input.state),
            country: Set(input.country),
            postal_code: Set(input.postal_code),
            priority: Set(input.priority),
            is_active: Set(input.is_active.unwrap_or(true)),
            ..Default::default()
        };

        let created = db::transaction(db, "create_warehouse", ctx, move |txn| {
            Box::pin(async move {
                model.insert(txn).await.map_err(|e| {
                    ServiceError::from_write_error(e, || {
                        format!("Warehouse code {} is already in use", code)
                    })
                })
            })
        })
        .await?;

        info!(warehouse_id = %created.id, code = %created.code, "Warehouse created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_warehouse(
        &self,
        lookup: WarehouseLookup,
    ) -> Result<warehouse::Model, ServiceError> {
        match lookup {
            WarehouseLookup::Id(id) => fetch_warehouse(self.db_pool.as_ref(), id).await,
            WarehouseLookup::Code(code) => {
                let code = require_non_blank(&code, "code")?;
                self.find_by_code(&code)
                    .await?
                    .ok_or(ServiceError::WarehouseNotFound(code))
            }
        }
    }

    #[instrument(skip(self, ctx, input))]
    pub async fn update_warehouse(
        &self,
        ctx: &CallContext,
        id: Uuid,
        input: UpdateWarehouseInput,
    ) -> Result<warehouse::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let existing = fetch_warehouse(db, id).await?;
        let mut active: warehouse::ActiveModel = existing.clone().into();

        if let Some(name) = input.name {
            active.name = Set(require_non_blank(&name, "name")?);
        }
        let mut new_code = None;
        if let Some(code) = input.code {
            let code = require_non_blank(&code, "code")?;
            if code != existing.code {
                if let Some(other) = self.find_by_code(&code).await? {
                    if other.id != id {
                        return Err(ServiceError::AlreadyExists(format!(
                            "Warehouse code {} is already in use",
                            code
                        )));
                    }
                }
                new_code = Some(code.clone());
                active.code = Set(code);
            }
        }
        if let Some(address) = input.address {
            active.address = Set(Some(address));
        }
        if let Some(city) = input.city {
            active.city = Set(Some(city));
        }
        if let Some(state) = input.state {
            active.state = Set(Some(state));
        }
        if let Some(country) = input.country {
            active.country = Set(Some(country));
        }
        if let Some(postal_code) = input.postal_code {
            active.postal_code = Set(Some(postal_code));
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }

        let updated = db::transaction(db, "update_warehouse", ctx, move |txn| {
            Box::pin(async move {
                active.update(txn).await.map_err(|e| {
                    ServiceError::from_write_error(e, || {
                        format!(
                            "Warehouse code {} is already in use",
                            new_code.unwrap_or_default()
                        )
                    })
                })
            })
        })
        .await?;

        info!(warehouse_id = %id, is_active = updated.is_active, "Warehouse updated");
        Ok(updated)
    }

    /// Lists warehouses by descending priority, then name.
    #[instrument(skip(self))]
    pub async fn list_warehouses(
        &self,
        page: u64,
        limit: u64,
        is_active: Option<bool>,
    ) -> Result<(Vec<warehouse::Model>, u64), ServiceError> {
        validate_pagination(page, limit, self.max_page_size)?;
        let db = self.db_pool.as_ref();

        let mut query = WarehouseEntity::find();
        if let Some(is_active) = is_active {
            query = query.filter(warehouse::Column::IsActive.eq(is_active));
        }

        let paginator = query
            .order_by_desc(warehouse::Column::Priority)
            .order_by_asc(warehouse::Column::Name)
            .paginate(db, limit);

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let warehouses = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok((warehouses, total))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<warehouse::Model>, ServiceError> {
        WarehouseEntity::find()
            .filter(warehouse::Column::Code.eq(code))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}
