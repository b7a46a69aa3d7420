//! Service-wide constants.

/// Maximum number of files accepted in a single upload batch.
pub const MAX_BATCH_FILES: usize = 10;

/// Maximum size of a single uploaded file (10 MiB).
pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// Lifetime processed-file cap for freemium accounts.
pub const FREEMIUM_FILE_LIMIT: i64 = 10;

/// Content types accepted for receipt uploads.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/bmp",
    "image/webp",
    "application/pdf",
];

/// Category assigned when the extraction service returns none.
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// Confidence reported for extracted receipts. The upstream service does not
/// currently return a per-receipt score.
pub const EXTRACTION_CONFIDENCE: f64 = 0.95;
