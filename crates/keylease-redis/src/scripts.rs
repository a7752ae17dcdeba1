//! Lua scripts run server-side by the Redis store

/// Delete `KEYS[1]` only when its value equals `ARGV[1]`.
/// Returns the number of deleted keys.
pub const RELEASE_LOCK: &str = r#"
    if redis.call('get', KEYS[1]) == ARGV[1] then
        return redis.call('del', KEYS[1])
    end
    return 0
"#;
