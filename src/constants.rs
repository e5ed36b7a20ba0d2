/// Constants module to avoid magic numbers in the codebase

// Network Configuration
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
// Scan analysis runs a model server-side and can take a while
pub const SCAN_ANALYSIS_TIMEOUT_SECS: u64 = 180;

// Session restore
pub const DEFAULT_RESTORE_ATTEMPTS: u32 = 3;
pub const DEFAULT_RESTORE_BACKOFF_MS: u64 = 2000;
pub const SESSION_FILE_NAME: &str = "session.toml";

// Polling
pub const CHANNEL_POLL_INTERVAL_SECS: u64 = 5;

// Payment deep links
pub const DEFAULT_PAYMENT_RETURN_URL: &str = "cannon://payment-success";
pub const DEFAULT_PAYMENT_CANCEL_URL: &str = "cannon://payment-cancel";

// Form rules
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub const ONBOARDING_GOALS: &[&str] = &[
    "jawline",
    "fat_loss",
    "skin",
    "posture",
    "symmetry",
    "hair",
];

pub const EXPERIENCE_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];

// Listing limits
pub const DEFAULT_SCAN_HISTORY_LIMIT: u32 = 10;

// Chat
pub const CHAT_FAILURE_REPLY: &str = "Sorry, something went wrong.";
