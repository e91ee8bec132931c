mod loader;
mod types;

pub use types::{
    ActorEntry, CarrierConfig, Config, ContactEntry, DirectoryConfig, EngineConfig, HttpConfig,
    TelemetryConfig,
};
