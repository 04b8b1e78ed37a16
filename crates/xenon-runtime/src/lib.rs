//! # Xenon Runtime
//!
//! Builds a connected `XenonClient` from a layered `RuntimeConfig`. The
//! `xenon` binary in this crate is a thin command-line front end over it.
//!
//! ## Modules
//!
//! - `config` - defaults, TOML file and `XENON_*` environment overrides
//! - `client` - component wiring and startup order

pub mod client;
pub mod config;

pub use client::{ClientError, XenonClient};
pub use config::{ConfigError, RuntimeConfig, DEFAULT_APP_NAME};
