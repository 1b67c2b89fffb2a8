pub use sea_orm_migration::prelude::*;

mod m20250201_000001_create_warehouses_and_items;
mod m20250201_000002_create_inventory_ledger_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250201_000001_create_warehouses_and_items::Migration),
            Box::new(m20250201_000002_create_inventory_ledger_tables::Migration),
        ]
    }
}
