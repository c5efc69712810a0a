/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate an opaque unique ID (UUID v4, string form).
///
/// Used for games, registrations and domain events alike; callers never
/// inspect the contents.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub const MILLIS_PER_HOUR: i64 = 60 * 60 * 1000;
