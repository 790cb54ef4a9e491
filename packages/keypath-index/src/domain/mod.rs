//! Domain layer: documents, index definitions, queries and the store port

pub mod models;
pub mod ports;

pub use models::*;
pub use ports::OrderedStore;
