pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_points;
mod m20251001_000002_create_point_transactions;
mod m20251001_000003_create_point_usage_history;
mod m20251008_000001_create_point_grant_claims;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_points::Migration),
            Box::new(m20251001_000002_create_point_transactions::Migration),
            Box::new(m20251001_000003_create_point_usage_history::Migration),
            Box::new(m20251008_000001_create_point_grant_claims::Migration),
        ]
    }
}
