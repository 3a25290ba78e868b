pub mod memory;

pub use memory::{InMemoryMatchStore, RecordingNotifier, StaticProfiles};
