//! Drive Relay Library
//!
//! Same-origin relay and resumable upload driver for Google Drive
//! attachments.
//!
//! # Modules
//!
//! - `relay`: wire contract and the upstream Drive client
//! - `upload`: the chunked resumable upload driver
//! - `auth`: stored credential resolution and refresh
//! - `routes`: axum handlers for the relay endpoints
//! - `config` / `state`: service configuration and shared state

pub mod auth;
pub mod config;
pub mod relay;
pub mod routes;
pub mod state;
pub mod upload;
