// Registry and catalogue
pub mod inventory_items;
pub mod warehouses;

// Quantity movement
pub mod allocation;
pub mod ledger;
pub mod reservations;

// Read-only queries
pub mod availability;

// Background work
pub mod reaper;

use crate::errors::ServiceError;

/// Checks 1-based pagination arguments against the configured page size cap.
pub(crate) fn validate_pagination(page: u64, limit: u64, max_page_size: u64) -> Result<(), ServiceError> {
    if page == 0 {
        return Err(ServiceError::InvalidInput(
            "Page number must be greater than 0".to_string(),
        ));
    }
    if limit == 0 || limit > max_page_size {
        return Err(ServiceError::InvalidInput(format!(
            "Limit must be between 1 and {}",
            max_page_size
        )));
    }
    Ok(())
}

/// Trims `value` and rejects it when nothing is left.
pub(crate) fn require_non_blank(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(format!("{} must not be blank", field)));
    }
    Ok(trimmed.to_string())
}
