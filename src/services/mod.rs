pub mod balance;
pub mod history;
pub mod journal;
pub mod ledger;

pub mod grant_service;
pub mod migration_service;
pub mod points_service;
pub mod reconciliation_service;

pub use grant_service::*;
pub use migration_service::*;
pub use points_service::*;
pub use reconciliation_service::*;
