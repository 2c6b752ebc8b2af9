pub mod client;
pub mod models;

pub use client::{ApiError, AuthMode, Credentials, RemoteAuthMethod, Result, SabClient};
pub use models::{History, HistorySlot, Queue, QueueSlot, SlotStatus};
