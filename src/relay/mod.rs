//! Drive Relay Module
//!
//! Stateless translation layer between same-origin callers and the Google
//! Drive REST surface. The relay attaches the short-lived credential, forwards
//! resumable-upload requests, and normalizes Drive's partial-success signal
//! (HTTP 308 + `Range`) into a continuation offset the upload driver can
//! branch on. It performs no buffering, no retries, and no chunk-size
//! decisions.

pub mod client;
pub mod types;

pub use client::DriveRelay;
pub use types::*;
