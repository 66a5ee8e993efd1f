//! In-memory adapters for tests and single-process development.

mod progress_store;
mod subscription_reader;

pub use progress_store::InMemoryProgressStore;
pub use subscription_reader::InMemorySubscriptionReader;
