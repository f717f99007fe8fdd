//! Table I/O and storage.

mod loader;
mod store;

pub use loader::TableLoader;
pub use store::{TableId, TableInfo, TableStore};
