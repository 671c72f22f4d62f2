// Service modules (daemon functionality)
pub mod http_server;
pub mod process;
pub mod scheduler;
pub mod service_config;
pub mod service_state;

pub use process::{init_tracing, spawn_service, start_service, start_with_state, ShutdownHandle};
pub use service_config::{BackendConfig, Config as ServiceConfig, ConfigError};
pub use service_state::{State as ServiceState, StateSetupError};

use http_server::health::version::BuildInfo;

pub fn build_info() -> BuildInfo {
    BuildInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
