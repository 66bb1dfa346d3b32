pub mod db;
pub mod memory;
pub mod storage;

pub use db::DbAdapter;
pub use memory::InMemoryStore;
pub use storage::LocalFileStorage;
