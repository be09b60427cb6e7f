//! Supply-chain analysis core: domain models, policies and pure services.
//!
//! Nothing in this module performs I/O; registry access, caching and stage
//! execution live in the application and adapter layers.
pub mod domain;
pub mod policies;
pub mod services;
