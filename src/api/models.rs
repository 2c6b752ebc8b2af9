use serde::{Deserialize, Serialize};

/// Envelope around the `mode=queue` JSON response
#[derive(Debug, Clone, Deserialize)]
pub struct QueueResponse {
    pub queue: Queue,
}

/// Envelope around the `mode=history` JSON response
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub history: History,
}

/// Active download queue as reported by the server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Queue {
    #[serde(default)]
    pub slots: Vec<QueueSlot>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub speedlimit: Option<String>,
}

/// One entry of the active queue
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueSlot {
    pub nzo_id: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: SlotStatus,
    #[serde(default)]
    pub cat: Option<String>,
}

/// Completed/failed download history as reported by the server
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct History {
    #[serde(default)]
    pub slots: Vec<HistorySlot>,
    /// Current transfer rate; the server reports it as a decimal string
    #[serde(default)]
    pub kbpersec: String,
}

impl History {
    /// Reported transfer rate in kB/s, 0.0 when unparseable
    pub fn transfer_rate(&self) -> f64 {
        self.kbpersec.parse().unwrap_or(0.0)
    }
}

/// One entry of the history listing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HistorySlot {
    pub nzo_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: SlotStatus,
}

/// Job status words used by the server. `Completed` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum SlotStatus {
    Grabbing,
    Queued,
    Paused,
    Downloading,
    Propagating,
    Fetching,
    Checking,
    Verifying,
    Repairing,
    Extracting,
    Moving,
    Running,
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Unknown,
}
