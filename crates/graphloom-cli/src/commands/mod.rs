pub mod load;
pub mod schema;
pub mod stats;
