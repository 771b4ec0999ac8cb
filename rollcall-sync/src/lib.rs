//! Offline-first synchronization engine for the Rollcall attendance tracker.
//!
//! Provides:
//! - Entity repositories backed by the local store with best-effort remote
//!   mirroring and remote-fallback lookups
//! - A sync engine running one reconciliation pass per trigger across
//!   teachers, students, attendance and the period config
//! - The academic period resolver
//! - Attendance recording flows and roster administration
//!
//! The local store is always the source of truth; remote failures degrade to
//! "local-only succeeded" and the next pass re-converges the mirror.

pub mod attendance;
pub mod calendar;
pub mod engine;
pub mod error;
pub mod notify;
pub mod paths;
pub mod period;
pub mod recorder;
pub mod roster;
pub mod students;
pub mod teachers;

mod mirror;

pub use attendance::AttendanceRepository;
pub use calendar::{CalendarRepository, DailyStatus};
pub use engine::{SyncConfig, SyncEngine, SyncOutcome, SyncStats};
pub use error::{SyncError, SyncResult};
pub use notify::{ChannelTrigger, LogNotifier, NoopTrigger, Notifier, SyncTrigger};
pub use period::{quarter_range, quarter_ranges, resolve_period, Division, Quarter};
pub use recorder::{start_of_today, AttendanceService, FALLBACK_QUARTER};
pub use roster::{NewStudent, RosterService};
pub use students::StudentRepository;
pub use teachers::TeacherRepository;
