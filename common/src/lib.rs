//! Shared models, status literals and the document store used by the
//! donation API.

#[macro_use]
pub mod macros;

agg_mod![db, memory, models, utils];

pub use db::{Document, DocumentStore, Filter, StoreError, UpdateResult};
pub use memory::MemoryStore;
