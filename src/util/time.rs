//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Simulation tick rate. Snapshots go out every tick.
pub const TICK_RATE: u32 = 60;
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / TICK_RATE as u64;

/// Fixed timestep for physics (in seconds)
pub fn tick_delta() -> f32 {
    1.0 / TICK_RATE as f32
}

/// Convert a duration in seconds to whole ticks
pub fn secs_to_ticks(secs: f32) -> u64 {
    (secs * TICK_RATE as f32).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_delta_matches_rate() {
        assert!((tick_delta() * TICK_RATE as f32 - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn secs_convert_to_whole_ticks() {
        assert_eq!(secs_to_ticks(1.0), TICK_RATE as u64);
        assert_eq!(secs_to_ticks(5.0), 5 * TICK_RATE as u64);
        assert_eq!(secs_to_ticks(0.25), 15);
    }
}
