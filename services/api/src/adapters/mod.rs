pub mod db;
pub mod object_store;

pub use db::DbAdapter;
pub use object_store::LocalObjectStore;
