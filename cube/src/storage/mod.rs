//! # Storage Module
//!
//! Persistent per-cell attribute storage.
//!
//! ## Architecture
//!
//! ```text
//! schema.rs  attribute name validation, key and row encodings
//! db.rs      store handle and scoped per-operation connections
//! store.rs   AttributeStore, schema management, slice/point reads and writes
//! ```
//!
//! ## Data Model
//!
//! ```text
//!            position (id → inline, crline, twt)
//!               ↑ id              ↑ id
//!   __cell_index (cell → id)   <attribute> (id → value)   one per attribute
//! ```
//!
//! A cell has exactly one `position` row and at most one row in each
//! attribute table. Attribute rows are only ever written for ids found in the
//! cell index, so every attribute row references an existing cell.

pub mod db;
pub mod schema;
pub mod store;

pub use db::{Connection, CubeDb};
pub use schema::{AttributeName, PositionRow};
pub use store::{AttributeStore, Sample};
