//! "Voucher transactions by sign" query.
//!
//! One store round-trip followed by the in-memory aggregation pipeline. The
//! query never returns `Err`: a failure at any step degrades to
//! [`QueryOutcome::Degraded`], whose [`QueryOutcome::into_result`] is the
//! empty listing (`vouchers: []`, `totalGrossProfit: 0`). Callers that need to
//! tell "no data" from "fetch failed" inspect the outcome instead.

use thiserror::Error;
use tracing::instrument;

use voucherbook_core::{DomainError, DomainResult, Sign};
use voucherbook_vouchers::{
    AggregationError, AggregationResult, Diagnostic, DiagnosticSink, DisplayOffset, PeriodFilter,
    SortOrder, TransactionAggregator,
};

use crate::diagnostics::TracingDiagnostics;
use crate::voucher_store::{VoucherStore, VoucherStoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryFailure {
    #[error("invalid query input: {0}")]
    InvalidInput(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] VoucherStoreError),

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Completed(AggregationResult),
    Degraded { reason: QueryFailure },
}

impl QueryOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, QueryOutcome::Degraded { .. })
    }

    pub fn failure(&self) -> Option<&QueryFailure> {
        match self {
            QueryOutcome::Completed(_) => None,
            QueryOutcome::Degraded { reason } => Some(reason),
        }
    }

    /// Fail-soft view: a degraded outcome becomes the empty listing.
    pub fn into_result(self) -> AggregationResult {
        match self {
            QueryOutcome::Completed(result) => result,
            QueryOutcome::Degraded { .. } => AggregationResult::empty(),
        }
    }

    pub fn into_strict(self) -> Result<AggregationResult, QueryFailure> {
        match self {
            QueryOutcome::Completed(result) => Ok(result),
            QueryOutcome::Degraded { reason } => Err(reason),
        }
    }
}

pub struct VoucherTransactionsQuery<S, D = TracingDiagnostics> {
    store: S,
    diagnostics: D,
    display_offset: DisplayOffset,
}

impl<S> VoucherTransactionsQuery<S>
where
    S: VoucherStore,
{
    pub fn new(store: S) -> Self {
        Self::with_diagnostics(store, TracingDiagnostics)
    }
}

impl<S, D> VoucherTransactionsQuery<S, D>
where
    S: VoucherStore,
    D: DiagnosticSink,
{
    pub fn with_diagnostics(store: S, diagnostics: D) -> Self {
        Self {
            store,
            diagnostics,
            display_offset: DisplayOffset::default(),
        }
    }

    pub fn with_display_offset(mut self, display_offset: DisplayOffset) -> Self {
        self.display_offset = display_offset;
        self
    }

    #[instrument(skip_all, fields(sign = %sign, sort_order = %sort_order))]
    pub async fn execute(
        &self,
        sign: &Sign,
        sort_order: SortOrder,
        period: PeriodFilter,
    ) -> QueryOutcome {
        self.diagnostics.emit(Diagnostic::FetchStarted { sign: sign.clone() });

        let vouchers = match self.store.find_by_sign(sign).await {
            Ok(vouchers) => vouchers,
            Err(err) => return self.degrade(sign.as_str(), err.into()),
        };

        if vouchers.is_empty() {
            self.diagnostics
                .emit(Diagnostic::NoVouchersFound { sign: sign.clone() });
        }

        let aggregator =
            TransactionAggregator::new(sort_order, period).with_display_offset(self.display_offset);

        match aggregator.aggregate(vouchers, &self.diagnostics) {
            Ok(result) => {
                self.diagnostics.emit(Diagnostic::Processed {
                    sign: sign.clone(),
                    voucher_count: result.vouchers.len(),
                    total_gross_profit: result.total_gross_profit,
                });
                QueryOutcome::Completed(result)
            }
            Err(err) => self.degrade(sign.as_str(), err.into()),
        }
    }

    /// Same as [`execute`](Self::execute), from raw request strings.
    ///
    /// Absent or blank `sort_order` means descending; absent or blank
    /// `year`/`month` mean no filter. Anything unparseable degrades the query.
    pub async fn execute_raw(
        &self,
        sign: &str,
        sort_order: Option<&str>,
        year: Option<&str>,
        month: Option<&str>,
    ) -> QueryOutcome {
        match parse_request(sign, sort_order, year, month) {
            Ok((sign, sort_order, period)) => self.execute(&sign, sort_order, period).await,
            Err(err) => self.degrade(sign, err.into()),
        }
    }

    fn degrade(&self, sign: &str, reason: QueryFailure) -> QueryOutcome {
        self.diagnostics.emit(Diagnostic::QueryFailed {
            sign: sign.to_string(),
            reason: reason.to_string(),
        });
        QueryOutcome::Degraded { reason }
    }
}

fn parse_request(
    sign: &str,
    sort_order: Option<&str>,
    year: Option<&str>,
    month: Option<&str>,
) -> DomainResult<(Sign, SortOrder, PeriodFilter)> {
    let sign = Sign::parse(sign)?;
    let sort_order = match sort_order.map(str::trim) {
        None | Some("") => SortOrder::default(),
        Some(raw) => raw.parse()?,
    };
    let period = PeriodFilter::parse(year, month)?;
    Ok((sign, sort_order, period))
}
