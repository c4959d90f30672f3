//! Project and service configuration.
//!
//! A project is an ordered collection of deployable services, each built by
//! exactly one language ecosystem. The pipeline only reads this model.

mod config;

pub use config::{ProjectConfig, ServiceConfig, ServiceLanguage};
