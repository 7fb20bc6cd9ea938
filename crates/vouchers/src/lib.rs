//! Vouchers domain module.
//!
//! This crate shapes voucher transaction histories into a reporting view:
//! date filtering, ordering, gross-profit aggregation and display formatting.
//! It is deterministic domain logic (no IO, no storage, no logging backend).

pub mod aggregation;
pub mod diagnostics;
pub mod query;
pub mod voucher;

pub use aggregation::{
    AggregationError, AggregationResult, EnrichedTransaction, EnrichedVoucher,
    TransactionAggregator,
};
pub use diagnostics::{Diagnostic, DiagnosticSink, NoopDiagnostics, RecordingDiagnostics};
pub use query::{DisplayOffset, PeriodFilter, SortOrder};
pub use voucher::{RawDate, Transaction, TransactionDetails, Voucher};
