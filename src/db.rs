pub mod pool;
pub mod sqlite_store;

pub use sqlite_store::{table_name_for, SqliteStore};
