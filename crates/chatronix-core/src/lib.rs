//! chatronix-core - Core library for Chatronix
//!
//! This crate contains the message models, the sync controller that reconciles
//! a live remote subscription with the local cache, and the backend adapters
//! (libSQL, Supabase, R2) shared by every Chatronix interface.

pub mod actions;
pub mod auth;
pub mod backend;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod network;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Attachment, Author, Message, MessageId};
pub use state::SyncMode;
pub use sync::{Outbox, SendError, SyncController};
