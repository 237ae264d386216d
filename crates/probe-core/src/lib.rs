//! Crash probe core library.
//!
//! Turns crash, info, uptime, reboot and guest VM events into evidence
//! directories and history records:
//! - Quota gate over each sender's output tree
//! - Log collection engine (copy, mmap tail, node drain, command capture,
//!   rotated-file selection)
//! - Crash reclassification families
//! - Sender bootstrap and event dispatch
//! - History log, event keys, evidence directories
//!
//! The binary entry point is in `main.rs`.

pub mod classify;
pub mod collect;
pub mod crashfile;
pub mod event;
pub mod eventid;
pub mod exit_codes;
pub mod history;
pub mod logdir;
pub mod logging;
pub mod platform;
pub mod quota;
pub mod sender;
pub mod vm_history;

pub use classify::{ClassifyError, CrashSpec, Reclassified, Reclassify};
pub use collect::{CollectError, LogCollector};
pub use event::{Channel, EventPayload, EventRecord, EventType};
pub use eventid::{EventIdGenerator, Sha256EventIds};
pub use exit_codes::ExitCode;
pub use history::{HistoryError, HistoryLog, HistoryRecord, HistoryStore};
pub use platform::{Platform, PlatformError, SystemPlatform};
pub use quota::space_available;
pub use sender::{init_senders, BootstrapError, CrashlogSender, SenderSet};
pub use vm_history::{FileVmHistory, VmHistorySource};
