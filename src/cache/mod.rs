mod cooldown;
mod file_store;

pub use cooldown::{CooldownPolicy, CooldownStore, InMemoryCooldownStore, SharedCooldownStore};
pub use file_store::JsonFileCooldownStore;
