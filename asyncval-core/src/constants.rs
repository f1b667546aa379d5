//! Defaults and environment variable names for asyncval.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// CAPACITY & EXPIRATION DEFAULTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default capacity bound enforced by the maintenance pass.
pub const DEFAULT_MAX_ITEMS: usize = 1000;

/// TTL used when neither the call nor the cache specifies one.
/// Effectively unbounded for an in-process cache: 365 days.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

// ═══════════════════════════════════════════════════════════════════════════════
// ENVIRONMENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Environment variable for [`crate::CacheConfig::max_items`].
pub const ENV_MAX_ITEMS: &str = "ASYNCVAL_MAX_ITEMS";

/// Environment variable for the cache-wide default TTL, in milliseconds.
pub const ENV_DEFAULT_TTL_MS: &str = "ASYNCVAL_DEFAULT_TTL_MS";

/// Environment variable for the periodic maintenance interval, in milliseconds.
pub const ENV_EXPIRATION_INTERVAL_MS: &str = "ASYNCVAL_EXPIRATION_INTERVAL_MS";
