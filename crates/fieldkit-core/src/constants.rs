//! Workspace-wide constants.

/// Prefix for human-facing requisition sequence numbers.
pub const SEQUENCE_PREFIX: &str = "REQ";

/// Zero-padded width of the per-day counter in a sequence number.
pub const SEQUENCE_PAD: usize = 4;

/// Default debounce window for coalescing sync requests, in seconds.
pub const DEFAULT_DEBOUNCE_WINDOW_SECS: u64 = 2;

/// Default bound on any single remote call, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 8;

/// Monetary values are rounded to this many decimal places.
pub const CURRENCY_SCALE: u32 = 2;
