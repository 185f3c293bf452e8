mod loader;
mod types;

pub use loader::{exe_dir, ConfigLoader};
pub use types::{Config, InventoryConfig, MessagesConfig};
