//! # session-core
//!
//! Subscriber admission for subscriber-gate. Tokens are normalized,
//! checked against a static blacklist and tracked as sessions with a
//! sliding idle timeout. Every admission decision lands in the CDR file
//! through [`audit_log::AuditRecorder`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use audit_log::AsyncLogger;
//! use session_core::{CoreConfig, SessionCore, Status};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AsyncLogger::open("server.log").await?;
//! logger.start();
//!
//! let core = SessionCore::new(&CoreConfig::default(), logger.clone()).await?;
//! core.start_scheduler().await;
//!
//! assert_eq!(core.handle("001010123456789").await, Status::Created);
//! assert!(core.is_active("001010123456789").await);
//!
//! core.shutdown().await;
//! logger.stop().await;
//! # Ok(())
//! # }
//! ```

mod admission;
mod blacklist;
mod config;
mod imsi;
mod manager;
mod scheduler;
mod service;
mod shutdown;
mod status;
mod store;

// Re-export primary public API at crate root.
pub use crate::admission::AdmissionController;
pub use crate::blacklist::Blacklist;
pub use crate::config::CoreConfig;
pub use crate::imsi::{Imsi, ImsiError, MAX_IMSI_LEN};
pub use crate::manager::SessionManager;
pub use crate::scheduler::{ExpiryScheduler, SWEEP_INTERVAL};
pub use crate::service::{CoreError, SessionCore};
pub use crate::shutdown::ShutdownCoordinator;
pub use crate::status::Status;
pub use crate::store::{Session, SessionStore, SessionTable};
