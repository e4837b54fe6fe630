pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{ClassifierSettings, DiscoverySettings, GlobalConfig, HttpSettings, RemoteSettings};
