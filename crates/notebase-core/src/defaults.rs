//! Centralized default constants for notebase.
//!
//! Both binaries reference these constants instead of defining their own
//! magic values.

// =============================================================================
// DATABASE GATEWAY
// =============================================================================

/// Default FQL endpoint (EU region group).
pub const FAUNA_ENDPOINT: &str = "https://db.eu.fauna.com";

/// Per-call timeout for gateway queries (seconds).
pub const QUERY_TIMEOUT_SECS: u64 = 10;

/// Queries slower than this are logged at WARN (milliseconds).
pub const SLOW_QUERY_MS: u64 = 2_000;

// =============================================================================
// NOTES
// =============================================================================

/// Collection holding the service's notes.
pub const NOTES_COLLECTION: &str = "notes";

/// Index over every document in [`NOTES_COLLECTION`], used for listing.
pub const NOTES_INDEX: &str = "note";

/// Page size the database applies when none is requested.
pub const PAGE_SIZE: u32 = 64;

/// Largest page size accepted from clients.
pub const PAGE_SIZE_MAX: u32 = 1_000;

// =============================================================================
// SERVER
// =============================================================================

/// Default bind address.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Maximum accepted request body size in bytes.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// PROVISIONING
// =============================================================================

/// Database created by the setup tool.
pub const SETUP_DATABASE: &str = "pifo";

/// Collection that receives the sample instances.
pub const SAMPLE_COLLECTION: &str = "Notes";

/// Unique index over `data.id` of [`SAMPLE_COLLECTION`].
pub const SAMPLE_INDEX: &str = "note_key";

/// Role granted to keys minted for the database.
pub const KEY_ROLE: &str = "server";

/// Marker stored in `data.issued_by` of every key the setup tool mints.
pub const KEY_ISSUER: &str = "notebase-setup";
