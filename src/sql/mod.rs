//! Parameterized SQL for model schemes.

mod builder;
mod params;
pub use builder::*;
pub use params::PgBindValue;
