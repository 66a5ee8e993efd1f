//! PostgreSQL adapters.

mod progress_store;
mod subscription_reader;

pub use progress_store::PostgresProgressStore;
pub use subscription_reader::PostgresSubscriptionReader;
