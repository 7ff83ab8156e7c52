//! Document numbering
//!
//! - [`format`]: number layout and canonical parsing
//! - [`scope`]: numbering scopes and periods
//! - [`allocator`]: counter-backed allocation with bounded retry
//! - [`scanner`]: streaming duplicate detection
//! - [`reconciler`]: per-group repair
//! - [`repair`]: check and repair runs
//! - [`scan_scheduler`]: periodic read-only scan

pub mod allocator;
pub mod error;
pub mod format;
pub mod reconciler;
pub mod repair;
pub mod scan_scheduler;
pub mod scanner;
pub mod scope;
pub mod store;

pub use allocator::{Allocator, AllocatorConfig, DocumentDraft};
pub use error::{NumberingError, NumberingResult, StoreError};
pub use format::{NumberFormat, Overflow, ParsedNumber};
pub use reconciler::{ReconcilePolicy, Reconciler, RepairAction};
pub use repair::RepairRun;
pub use scanner::{DuplicateScanner, ScanCursor};
pub use scope::{PeriodKey, Scope};
pub use store::NumberingStore;
