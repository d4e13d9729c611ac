//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → Engine::start / Engine::install
//! ```
//!
//! # Design Decisions
//! - Config is read once when an engine starts; a running engine never reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{EngineConfig, ObservabilityConfig, TimerConfig};
pub use validation::{validate_config, ValidationError};
