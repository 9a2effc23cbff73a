use std::sync::atomic::{AtomicI64, Ordering};

pub fn new_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Hands out millisecond timestamps for conversation and message ids.
///
/// Ids follow wall-clock time but are strictly increasing per generator:
/// two calls within the same millisecond get consecutive values, so an id
/// is never handed out twice by one process.
#[derive(Debug, Default)]
pub struct TimeIdGenerator {
    last: AtomicI64,
}

impl TimeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start above `floor`, e.g. the largest id already persisted.
    pub fn starting_after(floor: i64) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    pub fn next_id(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev.saturating_add(1));
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Bump the floor so later ids sort after `id`.
    pub fn observe(&self, id: i64) {
        self.last.fetch_max(id, Ordering::AcqRel);
    }
}
