pub mod color;
pub mod query;
