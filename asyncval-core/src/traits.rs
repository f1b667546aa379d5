//! Common traits for asyncval.

// ═══════════════════════════════════════════════════════════════════════════════
// MAINTENANCE TRIGGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Something a periodic scheduler can ask to sweep expired and surplus entries.
///
/// The cache engine implements this; timers only ever see the trait, which keeps
/// scheduling out of the engine's core logic.
pub trait ExpirationHandler: Send + Sync + 'static {
    /// Runs one synchronous maintenance pass.
    fn handle_expiration(&self);
}
