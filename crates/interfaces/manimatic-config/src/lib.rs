//! Central configuration constants for runtime limits and defaults.

/// Backend base URL used when neither settings, environment nor flags provide one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Environment variable overriding the configured backend base URL.
pub const API_BASE_URL_ENV: &str = "MANIMATIC_API_BASE_URL";

/// Deadline for the first push event after a generate or compile request (ms).
pub const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 30_000;

/// How long the CLI waits for the render that follows a generated script (seconds).
/// The deadline above only covers the first event after a request.
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 300;

/// Shortest accepted generation deadline (ms).
pub const MIN_GENERATION_TIMEOUT_MS: u64 = 1_000;

/// Longest accepted generation deadline (ms). 10 minutes.
pub const MAX_GENERATION_TIMEOUT_MS: u64 = 10 * 60 * 1_000;

/// How long a transient notice stays visible (ms).
pub const DEFAULT_NOTICE_TTL_MS: u64 = 6_000;

/// Per-request timeout for the short fire-and-forget calls (seconds).
/// Never applied to the push channel.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// TCP connect timeout for every call, push channel included (seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Capacity of the orchestrator's inbound event queue.
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// Longest single line accepted on the push channel (bytes).
pub const MAX_EVENT_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Attempts made when downloading a rendered video.
pub const DOWNLOAD_ATTEMPTS: usize = 3;

/// Convenience function to clamp a deadline into the allowed range.
pub fn clamp_timeout_ms(v: u64) -> u64 {
    v.clamp(MIN_GENERATION_TIMEOUT_MS, MAX_GENERATION_TIMEOUT_MS)
}
