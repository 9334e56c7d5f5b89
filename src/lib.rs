//! svcctl library
//!
//! Manages operating-system services through the system service manager
//! and package manager: reading and writing per-service JSON
//! configuration, probing service state, and installing, starting,
//! stopping and removing services one at a time or in batches.

pub mod agent;
pub mod config;
pub mod controller;
pub mod error;
pub mod executor;
pub mod services;
pub mod validation;
