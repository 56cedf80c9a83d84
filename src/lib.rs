//! berth: lifecycle commands for accessory containers.
//!
//! Accessories are long-running sidecar workloads (databases, caches, ...)
//! deployed next to an application on plain hosts. This crate encodes how
//! their container-runtime, reverse-proxy and ssh invocations are built:
//!
//! - [`config`]: resolved, read-only accessory and deployment settings
//! - [`commands`]: pure builders producing [`commands::Command`] and
//!   [`commands::Pipeline`] values
//! - [`routing`]: decides whether a command runs directly or through a
//!   remote shell on the accessory's first host
//! - [`runner`]: the [`runner::CommandRunner`] seam and a process-spawning
//!   implementation
//!
//! ```rust
//! use berth::commands::AccessoryCommands;
//! use berth::config::{AccessoryConfig, DeployConfig};
//!
//! let deploy = DeployConfig::default();
//! let redis = AccessoryConfig {
//!     name: "redis".into(),
//!     service_name: "redis".into(),
//!     image: "redis:7".into(),
//!     hosts: vec!["10.0.0.1".into()],
//!     ..Default::default()
//! };
//!
//! let commands = AccessoryCommands::new(&deploy, &redis);
//! assert_eq!(
//!     commands.run().to_string(),
//!     "docker run --name redis --detach --restart unless-stopped redis:7"
//! );
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod routing;
pub mod runner;
pub mod testing;

pub use error::{ConfigError, Error, ExecutionError, MissingFileError, Result};
