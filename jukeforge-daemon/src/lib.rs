//! Jukeforge daemon library
//!
//! Hosts the provider manager and its configuration. The modules are exported
//! so the binary and the integration tests share them.

pub mod config;
pub mod error;
pub mod init_writer;
pub mod manager;

pub use error::{ManagerError, ManagerResult, PluginKind};
pub use manager::{InitFailure, InitReport, PluginStatusReport, ProviderManager};
