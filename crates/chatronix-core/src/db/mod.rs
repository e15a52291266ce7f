//! Database layer for Chatronix

mod connection;
mod migrations;

pub use connection::{Database, Schema, SyncConfig};
