// src/constants.rs
//! Domain constants that define the operational boundaries of the engine.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role. Reading these constants should tell you the story of how
//! the engine operates: how it pages through the catalog, how large a
//! boundary file may be, how loose an identifier comparison is allowed to get.

// ---------------------------------------------------------------------------
// Catalog pagination boundaries
// ---------------------------------------------------------------------------

/// How many farm records the backend returns per catalog page.
///
/// The first retrieval strategy always asks for this size. Larger pages mean
/// fewer round-trips against a backend whose pagination is already fragile.
pub const CATALOG_PAGE_SIZE: u32 = 100;

/// Page size for the wide probe used when normal-size pages come back empty.
///
/// One oversized request is cheaper than re-walking a paginator that may be
/// mis-counting; this is the third rung of the fallback ladder.
pub const CATALOG_WIDE_PAGE_SIZE: u32 = 500;

/// Hard ceiling on how many pages a single strategy will walk.
///
/// Protects against a paginator that reports `totalPages` wrong or never
/// stops advancing `currentPage`. Far above any real tenant's catalog.
pub const CATALOG_MAX_PAGES: u32 = 200;

// ---------------------------------------------------------------------------
// Identifier heuristics
// ---------------------------------------------------------------------------

/// Minimum identifier length before the suffix-match heuristic may fire.
///
/// Anything shorter is compared exactly or not at all; a suffix match on a
/// two-character id would be indistinguishable from a collision.
pub const ID_HEURISTIC_MIN_LEN: usize = 4;

/// Number of trailing characters compared by the suffix-match heuristic.
///
/// Backends have been observed returning the same record with truncated and
/// full encodings of one id; six trailing characters disambiguates those
/// while keeping accidental matches unlikely.
pub const ID_HEURISTIC_SUFFIX_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Boundary upload boundaries
// ---------------------------------------------------------------------------

/// Maximum accepted boundary file size in bytes (1 MiB).
///
/// Larger files are rejected before any state transition or network call.
pub const MAX_BOUNDARY_FILE_BYTES: usize = 1024 * 1024;

/// File extensions accepted for boundary uploads, lowercase.
pub const ACCEPTED_BOUNDARY_EXTENSIONS: [&str; 2] = ["kml", "kmz"];

// ---------------------------------------------------------------------------
// Retry policy (idempotent reads only)
// ---------------------------------------------------------------------------

/// Attempts made for an idempotent catalog/farmer read before giving up.
pub const READ_RETRY_ATTEMPTS: u32 = 3;

/// Initial backoff delay between read retries, in milliseconds.
pub const READ_RETRY_INITIAL_DELAY_MS: u64 = 100;

/// Backoff delay cap for read retries, in milliseconds.
pub const READ_RETRY_MAX_DELAY_MS: u64 = 5_000;

// ---------------------------------------------------------------------------
// Event stream
// ---------------------------------------------------------------------------

/// Buffered capacity of the engine event channel.
///
/// Slow subscribers that fall further behind than this lose the oldest
/// events; the engine never blocks on its observers.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
