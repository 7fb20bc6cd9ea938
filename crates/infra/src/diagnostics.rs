//! Bridge from domain diagnostics to `tracing` events.

use voucherbook_vouchers::{Diagnostic, DiagnosticSink};

/// Emits each diagnostic as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn emit(&self, diagnostic: Diagnostic) {
        match diagnostic {
            Diagnostic::FetchStarted { sign } => {
                tracing::info!(%sign, "fetching vouchers");
            }
            Diagnostic::NoVouchersFound { sign } => {
                tracing::info!(%sign, "no vouchers found");
            }
            Diagnostic::EmptyHistory { voucher_id } => {
                tracing::info!(%voucher_id, "voucher has no transactions");
            }
            Diagnostic::InvalidTransactionDate {
                voucher_id,
                transaction_id,
            } => {
                tracing::warn!(
                    %voucher_id,
                    %transaction_id,
                    "invalid or missing transaction date; transaction skipped"
                );
            }
            Diagnostic::Processed {
                sign,
                voucher_count,
                total_gross_profit,
            } => {
                tracing::info!(%sign, voucher_count, total_gross_profit, "vouchers processed");
            }
            Diagnostic::QueryFailed { sign, reason } => {
                tracing::error!(%sign, %reason, "voucher query failed");
            }
        }
    }
}
