/*!
 * Tracing
 * Structured tracing for trap dispatch using the tracing crate
 *
 * Features:
 * - Env-driven filtering via RUST_LOG
 * - JSON-formatted output for structured parsing
 * - Per-trap spans with duration and result fields
 */

use crate::core::types::TrapWord;
use crate::traps::Trap;
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    EnvFilter,
};

/// Traps slower than this are reported at warn level
const SLOW_TRAP_MICROS: u128 = 1_000;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - GUEST_MM_TRACE_JSON: Enable JSON output (default: false)
///
/// Fails if a global subscriber is already installed; the embedder's
/// subscriber is left in place.
pub fn init_tracing() -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("GUEST_MM_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
        info!("Structured tracing initialized with JSON output");
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()?;
        info!("Structured tracing initialized");
    }
    Ok(())
}

/// Span covering one trap, logged with its duration when dropped
pub struct TrapSpan {
    span: tracing::Span,
    start: Instant,
    trap: Trap,
}

impl TrapSpan {
    pub fn new(trap: Trap, word: TrapWord) -> Self {
        let span = span!(
            Level::DEBUG,
            "trap",
            trap = trap.name(),
            word = %format_args!("{:04x}", word),
            result = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            trap,
        }
    }

    /// Record the D0 result code
    pub fn record_result(&self, code: u16) {
        self.span.record("result", code as i16 as i64);
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for TrapSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_micros();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration as u64);

        if duration > SLOW_TRAP_MICROS {
            warn!(trap = self.trap.name(), duration_us = duration as u64, "slow trap");
        } else {
            debug!(trap = self.trap.name(), duration_us = duration as u64, "trap completed");
        }
    }
}

/// Helper to create a trap span
#[inline]
pub fn span_trap(trap: Trap, word: TrapWord) -> TrapSpan {
    TrapSpan::new(trap, word)
}
