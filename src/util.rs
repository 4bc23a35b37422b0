use crossbeam::atomic::AtomicCell;

pub type IdType = u64;

/// Source of connection ids. Never reused for the lifetime of the process.
pub static ID_COUNTER: AtomicCell<IdType> = AtomicCell::new(1);

/// Unix timestamp in milliseconds, used for chat and song request times.
pub fn unix_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
