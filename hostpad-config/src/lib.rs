//! Configuration library for hostpad.
//!
//! Settings are layered: a `.env` file is loaded into the process
//! environment, an optional TOML file supplies base values, environment
//! variables override the file, and defaults fill whatever is left. The
//! composed [`Config`] then passes through guard rails that either reject it
//! or attach [`ConfigWarnings`] for the operator.

pub mod loader;
pub mod models;
pub mod sources;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    AccessConfig, ActionsConfig, Config, ConfigMetadata, PathsConfig,
    ServerConfig, ShoutConfig,
};
pub use sources::{EnvConfig, FileConfig};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
