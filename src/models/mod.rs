pub mod common;
pub mod pagination;
pub mod points;

pub use common::*;
pub use pagination::*;
pub use points::*;
