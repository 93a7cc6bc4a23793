//! # Arc Runtime
//!
//! Wires the Arc client cores into one lifecycle-scoped `ArcContext` and
//! exposes the organization operations built on them.
//!
//! ## Modular Structure
//!
//! - `config` - `ArcConfig` from environment variables
//! - `logging` - global `tracing` subscriber setup
//! - `context` - `ArcContext` owning bus, tracker, cache, directory, discovery
//! - `organization` - `new_dao`, `register_schemes` and discovery queries
//! - `errors` - `ArcError`, every failure naming its operation
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`ArcConfig::from_env`)
//! 2. Initialize logging (`logging::init_tracing`)
//! 3. Connect a network collaborator
//! 4. `ArcContext::initialize` resolves the handle directory
//! 5. Subscribe to `txReceipts` topics, run operations
//!
//! ## Usage Example
//!
//! ```ignore
//! let config = ArcConfig::from_env()?;
//! logging::init_tracing(&config)?;
//! let context = ArcContext::initialize(config, network).await?;
//!
//! let _progress = context.bus().subscribe(
//!     TopicPattern::parse("txReceipts.DAO.new")?,
//!     |topic, event| { /* render progress */ Ok(()) },
//! );
//! let dao = context.organizations().new_dao(&request).await?;
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod organization;

pub use config::ArcConfig;
pub use context::ArcContext;
pub use errors::{ArcError, ConfigError, OperationFailure};
pub use organization::{
    Founder, NewDaoRequest, Organization, OrganizationService, SchemeRegistration,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
