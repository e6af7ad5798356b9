pub mod store;
pub mod types;

pub use store::{InMemoryLifecycleEventStore, LifecycleEventStore};
pub use types::{LifecycleEvent, LifecycleEventKind};
