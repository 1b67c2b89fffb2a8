//! Inventory Engine Library
//!
//! Keeps per-SKU and per-warehouse stock consistent under concurrent
//! allocation, reservation, confirmation and expiry.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod events;
pub mod services;

pub use context::CallContext;
pub use engine::InventoryEngine;
pub use errors::ServiceError;
