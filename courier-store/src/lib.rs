pub mod app_config;
pub mod database;
pub mod delivery_repo;
pub mod lookup;
pub mod memory;

pub use app_config::Config;
pub use database::DbClient;
pub use delivery_repo::PgDeliveryStore;
pub use lookup::{HttpBranchConfigLookup, HttpOrderLookup};
pub use memory::InMemoryDeliveryStore;
