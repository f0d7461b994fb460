/*!
 * Monitoring
 * Tracing setup and trap spans
 */

mod tracer;

pub use tracer::{init_tracing, span_trap, TrapSpan};
