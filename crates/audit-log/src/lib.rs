//! Audit and diagnostic logging for subscriber-gate.
//!
//! Two independent sinks live here:
//!
//! * [`AuditRecorder`] owns the CDR file, an append-only trail with one line
//!   per admission decision: `<YYYY-MM-DD HH:MM:SS>, <imsi>, <action>`.
//! * [`AsyncLogger`] is a queue-backed diagnostic log. Producers never block;
//!   a single writer task appends `[<YYYY-MM-DD HH:MM:SS>] <message>` lines.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use audit_log::{AsyncLogger, AuditAction, AuditRecorder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AsyncLogger::open("/var/log/subscriber-gate/server.log").await?;
//! logger.start();
//! logger.send_to_log("server starting");
//!
//! let cdr = AuditRecorder::open("/var/log/subscriber-gate/cdr.log").await?;
//! cdr.record("001010123456789", AuditAction::Created).await;
//!
//! cdr.close().await;
//! logger.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod logger;
pub mod recorder;
pub mod writer;

// Re-export primary public types at the crate root for convenience.
pub use entry::{format_timestamp, AuditAction, AuditRecord, TIMESTAMP_FORMAT};
pub use logger::{AsyncLogger, LogError};
pub use recorder::AuditRecorder;
pub use writer::{AuditWriteError, AuditWriter};
