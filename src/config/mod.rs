//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → TOML file (loader.rs), non-default fields win
//!     → environment variables (loader.rs), non-default fields win
//!     → validation.rs (semantic checks, all errors collected)
//!     → ServiceSettings (validated, immutable)
//!     → read by the bootstrapper and instruments only
//! ```
//!
//! All fields have defaults to allow minimal configs. Validation separates
//! syntactic (serde) from semantic checks.

pub mod loader;
pub mod merge;
pub mod schema;
pub mod validation;

pub use loader::ConfigError;
pub use merge::{merge_field, Merge};
pub use schema::{ServerSettings, ServiceSettings};
pub use validation::{validate_settings, ValidationError};
