//! Diagnostics observer seam.
//!
//! The aggregation pipeline never logs directly. It reports noteworthy
//! situations (skipped transactions, empty histories, failures) to a
//! [`DiagnosticSink`], which the caller chooses: a logging bridge in
//! production, a recorder in tests.

use std::sync::{Arc, Mutex};

use voucherbook_core::{Sign, TransactionId, VoucherId};

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    FetchStarted {
        sign: Sign,
    },
    NoVouchersFound {
        sign: Sign,
    },
    EmptyHistory {
        voucher_id: VoucherId,
    },
    /// Transaction dropped because its date is missing or unparseable.
    InvalidTransactionDate {
        voucher_id: VoucherId,
        transaction_id: TransactionId,
    },
    Processed {
        sign: Sign,
        voucher_count: usize,
        total_gross_profit: f64,
    },
    QueryFailed {
        sign: String,
        reason: String,
    },
}

pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, diagnostic: Diagnostic);
}

impl<S> DiagnosticSink for Arc<S>
where
    S: DiagnosticSink + ?Sized,
{
    fn emit(&self, diagnostic: Diagnostic) {
        (**self).emit(diagnostic)
    }
}

/// Discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl DiagnosticSink for NoopDiagnostics {
    fn emit(&self, _diagnostic: Diagnostic) {}
}

/// Collects diagnostics in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    inner: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<Diagnostic> {
        match self.inner.lock() {
            Ok(events) => events.clone(),
            Err(_) => vec![],
        }
    }
}

impl DiagnosticSink for RecordingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        if let Ok(mut events) = self.inner.lock() {
            events.push(diagnostic);
        }
    }
}
