pub mod inventory_item;
pub mod inventory_location;
pub mod inventory_reservation;
pub mod inventory_transaction;
pub mod warehouse;
