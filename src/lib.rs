#![doc = "mc-utils: small utilities plus a client for the Modern Campus CMS API."]

//! Modules:
//! - [`date`]: file-system-safe timestamps
//! - [`logs`]: coloured terminal logging
//! - [`secrets`]: 1Password CLI shim
//! - [`cms`]: CMS client, token cache and the page/asset transactions built on it
//!
//! The `mc-utils` binary wires these together through [`cli::run`].

pub mod cli;
pub mod cms;
pub mod config;
pub mod date;
pub mod load_config;
pub mod logs;
pub mod secrets;
