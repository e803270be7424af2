pub mod enums;
pub mod point_grant_claims;
pub mod point_transactions;
pub mod point_usage_history;
pub mod points;

pub use enums::{PointKind, PointSource, UsageType};

pub use point_grant_claims as grant_claim_entity;
pub use point_transactions as ledger_entry_entity;
pub use point_usage_history as spend_record_entity;
pub use points as balance_entity;
