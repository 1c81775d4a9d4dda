//! Filtering, spatial grouping and view aggregation for specimen maps.
//!
//! Records flow through the cascading filters, get bucketed by rounded
//! coordinate, and are then either scattered apart or collapsed per taxon
//! before the color map is derived from whatever ends up on screen.

pub mod data;
pub mod engine;
pub mod filter;
pub mod geo;
pub mod map;
pub mod palette;
pub mod query;
pub mod settings;

pub use engine::Engine;
