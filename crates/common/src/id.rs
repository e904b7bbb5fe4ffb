//! ID generation utilities.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use crate::{AppError, AppResult};

/// Custom epoch for snowflake IDs (2024-01-01T00:00:00Z, in milliseconds).
pub const EPOCH_MILLIS: i64 = 1_704_067_200_000;

const WORKER_BITS: u32 = 10;
const SEQUENCE_BITS: u32 = 12;
const MAX_WORKER_ID: u16 = (1 << WORKER_BITS) - 1;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

#[derive(Debug, Default)]
struct SnowflakeState {
    last_millis: i64,
    sequence: i64,
}

/// ID generator for file records.
///
/// Record IDs are 63-bit snowflakes: milliseconds since [`EPOCH_MILLIS`],
/// then a 10-bit worker ID, then a 12-bit per-millisecond sequence.
/// Clones share state, so IDs stay unique across clones.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    worker_id: i64,
    state: Arc<Mutex<SnowflakeState>>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self {
            worker_id: 0,
            state: Arc::default(),
        }
    }
}

impl IdGenerator {
    /// Create a new ID generator for the given worker.
    pub fn new(worker_id: u16) -> AppResult<Self> {
        if worker_id > MAX_WORKER_ID {
            return Err(AppError::Config(format!(
                "worker_id must be at most {MAX_WORKER_ID}, got {worker_id}"
            )));
        }

        Ok(Self {
            worker_id: i64::from(worker_id),
            state: Arc::default(),
        })
    }

    /// Generate a new snowflake ID.
    ///
    /// IDs from one generator are strictly increasing. If the clock moves
    /// backwards the last seen millisecond is reused, and once its sequence
    /// is used up the generator moves on to the next millisecond without
    /// waiting for the clock.
    #[must_use]
    pub fn generate(&self) -> i64 {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        let mut now = (Utc::now().timestamp_millis() - EPOCH_MILLIS).max(state.last_millis);

        if now == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                now += 1;
            }
        } else {
            state.sequence = 0;
        }

        state.last_millis = now;

        (now << (WORKER_BITS + SEQUENCE_BITS)) | (self.worker_id << SEQUENCE_BITS) | state.sequence
    }

    /// Generate a new random UUID v4 file identifier.
    #[must_use]
    pub fn generate_file_uuid(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
