/// Application name
pub const APP_NAME: &str = "Townboard";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Visibility windows (days) a submitter may pick for a listing or vendor
pub const VISIBILITY_WINDOWS: [u32; 6] = [7, 15, 30, 45, 60, 90];

/// Upper bound the moderator UI accepts for a single extension
pub const MAX_EXTEND_DAYS: i64 = 365;

/// Star rating bounds
pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

/// Status sentinels written to the `Approved` column
pub const APPROVED_SENTINEL: &str = "TRUE";
pub const REJECTED_SENTINEL: &str = "REJECTED";
pub const PENDING_SENTINEL: &str = "FALSE";

/// Ticket status cells
pub const TICKET_OPEN: &str = "Open";
pub const TICKET_CLOSED: &str = "Closed";

/// Read cache time-to-live in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30;

/// Store retry defaults (capped exponential backoff)
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_BASE_MS: u64 = 250;
pub const DEFAULT_RETRY_MAX_MS: u64 = 8_000;

/// Calendar date format used for `ExpiresOn` cells
pub const DATE_FORMAT: &str = "%Y-%m-%d";
