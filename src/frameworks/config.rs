use std::env;

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("WORLD_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3004)
}

pub fn database_url() -> Option<String> {
    env::var("DATABASE_URL").ok().filter(|v| !v.is_empty())
}

pub const EVENT_CHANNEL_CAPACITY: usize = 256;
pub const FRAME_CHANNEL_CAPACITY: usize = 256;
