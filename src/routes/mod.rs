//! Route modules for the relay

pub mod drive;
