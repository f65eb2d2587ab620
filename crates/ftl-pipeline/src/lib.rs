//! The three pipeline stages exposed to a host: extraction, semantic
//! mapping, and the read-only query surface (spec §6's invocation
//! interface).

pub mod extract;
pub mod map;
pub mod query;
