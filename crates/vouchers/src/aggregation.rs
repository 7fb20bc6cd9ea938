//! Transaction history aggregation: filter → sort → sum → format.
//!
//! Each voucher is processed independently and in input order:
//!
//! 1. drop transactions whose date is missing/invalid (reported as a
//!    diagnostic) or outside the requested [`PeriodFilter`];
//! 2. order the rest by instant per [`SortOrder`] (stable for ties);
//! 3. sum their prices into `grossProfit` (absent price counts as zero, sums
//!    that leave the finite range are errors);
//! 4. attach a `formattedDate` rendered with the [`DisplayOffset`].
//!
//! Every input voucher appears in the output, even when nothing survives the
//! filter. `totalGrossProfit` is always the sum of the per-voucher figures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use voucherbook_core::{Sign, VoucherId};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::query::{DisplayOffset, PeriodFilter, SortOrder};
use crate::voucher::{Transaction, Voucher, serialize_amount};

const GROSS_PROFIT_FIELD: &str = "grossProfit";
const FORMATTED_DATE_FIELD: &str = "formattedDate";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("gross profit overflow in voucher {voucher_id}")]
    GrossProfitOverflow { voucher_id: VoucherId },

    #[error("total gross profit overflow")]
    TotalOverflow,
}

/// A retained transaction annotated with its display date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,

    #[serde(rename = "formattedDate")]
    pub formatted_date: String,

    /// Parsed instant the ordering was based on.
    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedVoucher {
    #[serde(rename = "_id")]
    pub id: VoucherId,

    pub sign: Sign,

    #[serde(rename = "historyTransaksi")]
    pub history: Vec<EnrichedTransaction>,

    #[serde(rename = "grossProfit", serialize_with = "serialize_amount")]
    pub gross_profit: f64,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    pub vouchers: Vec<EnrichedVoucher>,
    #[serde(serialize_with = "serialize_amount")]
    pub total_gross_profit: f64,
}

impl AggregationResult {
    /// The result handed out when the query could not be answered.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.vouchers.is_empty()
    }
}

/// Shapes voucher histories for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionAggregator {
    sort_order: SortOrder,
    period: PeriodFilter,
    display_offset: DisplayOffset,
}

impl TransactionAggregator {
    pub fn new(sort_order: SortOrder, period: PeriodFilter) -> Self {
        Self {
            sort_order,
            period,
            display_offset: DisplayOffset::default(),
        }
    }

    pub fn with_display_offset(mut self, display_offset: DisplayOffset) -> Self {
        self.display_offset = display_offset;
        self
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn period(&self) -> PeriodFilter {
        self.period
    }

    pub fn display_offset(&self) -> DisplayOffset {
        self.display_offset
    }

    pub fn aggregate<D>(
        &self,
        vouchers: Vec<Voucher>,
        diagnostics: &D,
    ) -> Result<AggregationResult, AggregationError>
    where
        D: DiagnosticSink + ?Sized,
    {
        let mut total_gross_profit = 0.0;
        let mut enriched = Vec::with_capacity(vouchers.len());

        for voucher in vouchers {
            let voucher = self.enrich(voucher, diagnostics)?;
            total_gross_profit += voucher.gross_profit;
            if !total_gross_profit.is_finite() {
                return Err(AggregationError::TotalOverflow);
            }
            enriched.push(voucher);
        }

        Ok(AggregationResult {
            vouchers: enriched,
            total_gross_profit,
        })
    }

    /// Filter, sort, sum and format a single voucher's history.
    pub fn enrich<D>(
        &self,
        voucher: Voucher,
        diagnostics: &D,
    ) -> Result<EnrichedVoucher, AggregationError>
    where
        D: DiagnosticSink + ?Sized,
    {
        let Voucher {
            id,
            sign,
            history,
            mut extra,
        } = voucher;
        extra.remove(GROSS_PROFIT_FIELD);

        if history.is_empty() {
            diagnostics.emit(Diagnostic::EmptyHistory {
                voucher_id: id.clone(),
            });
        }

        let mut retained: Vec<(DateTime<Utc>, Transaction)> = Vec::with_capacity(history.len());
        for transaction in history {
            match transaction.timestamp() {
                Some(instant) => {
                    if self.period.matches(&instant) {
                        retained.push((instant, transaction));
                    }
                }
                None => diagnostics.emit(Diagnostic::InvalidTransactionDate {
                    voucher_id: id.clone(),
                    transaction_id: transaction.id.clone(),
                }),
            }
        }

        match self.sort_order {
            SortOrder::Asc => retained.sort_by(|a, b| a.0.cmp(&b.0)),
            SortOrder::Desc => retained.sort_by(|a, b| b.0.cmp(&a.0)),
        }

        let gross_profit = retained.iter().fold(0.0, |acc, (_, t)| acc + t.price());
        if !gross_profit.is_finite() {
            return Err(AggregationError::GrossProfitOverflow { voucher_id: id });
        }

        let history = retained
            .into_iter()
            .map(|(instant, mut transaction)| {
                transaction.extra.remove(FORMATTED_DATE_FIELD);
                EnrichedTransaction {
                    formatted_date: self.display_offset.format(&instant),
                    timestamp: instant,
                    transaction,
                }
            })
            .collect();

        Ok(EnrichedVoucher {
            id,
            sign,
            history,
            gross_profit,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{NoopDiagnostics, RecordingDiagnostics};
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use serde_json::json;
    use voucherbook_core::TransactionId;

    fn sign() -> Sign {
        Sign::parse("SHOP-1").unwrap()
    }

    fn voucher(id: &str) -> Voucher {
        Voucher::new(VoucherId::parse(id).unwrap(), sign())
    }

    fn tx(id: &str) -> Transaction {
        Transaction::new(TransactionId::parse(id).unwrap())
    }

    fn ids(voucher: &EnrichedVoucher) -> Vec<&str> {
        voucher
            .history
            .iter()
            .map(|t| t.transaction.id.as_str())
            .collect()
    }

    #[test]
    fn keeps_only_transactions_in_requested_month() {
        let input = voucher("v1")
            .with_transaction(tx("june-2024").dated("2024-06-01").priced(100.0))
            .with_transaction(tx("july-2024").dated("2024-07-01").priced(200.0))
            .with_transaction(tx("june-2023").dated("2023-06-01").priced(400.0));

        let period = PeriodFilter::parse(Some("2024"), Some("6")).unwrap();
        let result = TransactionAggregator::new(SortOrder::Desc, period)
            .aggregate(vec![input], &NoopDiagnostics)
            .unwrap();

        assert_eq!(ids(&result.vouchers[0]), vec!["june-2024"]);
        assert_eq!(result.vouchers[0].gross_profit, 100.0);
        assert_eq!(result.total_gross_profit, 100.0);
    }

    #[test]
    fn missing_and_invalid_dates_are_dropped_and_reported() {
        let input = voucher("v1")
            .with_transaction(tx("no-date").priced(50.0))
            .with_transaction(tx("bad-date").dated("yesterday").priced(60.0))
            .with_transaction(tx("ok").dated("2024-02-10T08:00:00Z").priced(70.0));

        let diagnostics = RecordingDiagnostics::new();
        let result = TransactionAggregator::default()
            .aggregate(vec![input], &diagnostics)
            .unwrap();

        assert_eq!(ids(&result.vouchers[0]), vec!["ok"]);
        assert_eq!(result.total_gross_profit, 70.0);

        let dropped: Vec<_> = diagnostics
            .snapshot()
            .into_iter()
            .filter_map(|d| match d {
                Diagnostic::InvalidTransactionDate { transaction_id, .. } => {
                    Some(transaction_id.into_inner())
                }
                _ => None,
            })
            .collect();
        assert_eq!(dropped, vec!["no-date".to_string(), "bad-date".to_string()]);
    }

    #[test]
    fn sorts_ascending_and_descending() {
        let input = voucher("v1")
            .with_transaction(tx("b").dated("2024-03-02"))
            .with_transaction(tx("c").dated("2024-03-03"))
            .with_transaction(tx("a").dated("2024-03-01"));

        let asc = TransactionAggregator::new(SortOrder::Asc, PeriodFilter::all())
            .aggregate(vec![input.clone()], &NoopDiagnostics)
            .unwrap();
        assert_eq!(ids(&asc.vouchers[0]), vec!["a", "b", "c"]);

        let desc = TransactionAggregator::new(SortOrder::Desc, PeriodFilter::all())
            .aggregate(vec![input], &NoopDiagnostics)
            .unwrap();
        assert_eq!(ids(&desc.vouchers[0]), vec!["c", "b", "a"]);
    }

    #[test]
    fn equal_timestamps_keep_document_order() {
        let input = voucher("v1")
            .with_transaction(tx("first").dated("2024-03-01T10:00:00Z"))
            .with_transaction(tx("second").dated("2024-03-01T10:00:00Z"));

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let result = TransactionAggregator::new(order, PeriodFilter::all())
                .aggregate(vec![input.clone()], &NoopDiagnostics)
                .unwrap();
            assert_eq!(ids(&result.vouchers[0]), vec!["first", "second"]);
        }
    }

    #[test]
    fn voucher_without_history_is_still_returned() {
        let diagnostics = RecordingDiagnostics::new();
        let result = TransactionAggregator::default()
            .aggregate(vec![voucher("empty"), voucher("other")], &diagnostics)
            .unwrap();

        assert_eq!(result.vouchers.len(), 2);
        assert!(result.vouchers[0].history.is_empty());
        assert_eq!(result.vouchers[0].gross_profit, 0.0);
        assert_eq!(result.total_gross_profit, 0.0);
        assert!(diagnostics.snapshot().contains(&Diagnostic::EmptyHistory {
            voucher_id: VoucherId::parse("empty").unwrap(),
        }));
    }

    #[test]
    fn formatted_date_uses_display_offset() {
        let input = voucher("v1").with_transaction(tx("t1").dated("2024-01-01T00:00:00Z"));

        let result = TransactionAggregator::default()
            .aggregate(vec![input.clone()], &NoopDiagnostics)
            .unwrap();
        assert_eq!(result.vouchers[0].history[0].formatted_date, "2024-01-01 07:00:00");

        let utc = TransactionAggregator::default()
            .with_display_offset(DisplayOffset::utc())
            .aggregate(vec![input], &NoopDiagnostics)
            .unwrap();
        assert_eq!(utc.vouchers[0].history[0].formatted_date, "2024-01-01 00:00:00");
    }

    #[test]
    fn absent_price_counts_as_zero() {
        let input = voucher("v1")
            .with_transaction(tx("priced").dated("2024-01-01").priced(1500.0))
            .with_transaction(tx("free").dated("2024-01-02"));

        let result = TransactionAggregator::default()
            .aggregate(vec![input], &NoopDiagnostics)
            .unwrap();
        assert_eq!(result.vouchers[0].history.len(), 2);
        assert_eq!(result.vouchers[0].gross_profit, 1500.0);
    }

    #[test]
    fn fractional_prices_are_summed() {
        let input = voucher("v1")
            .with_transaction(tx("a").dated("2024-01-01").priced(12500.5))
            .with_transaction(tx("b").dated("2024-01-02").priced(100.0));
        let other = voucher("v2")
            .with_transaction(tx("c").dated("2024-01-03").priced(7.0));

        let result = TransactionAggregator::default()
            .aggregate(vec![input, other], &NoopDiagnostics)
            .unwrap();

        assert_eq!(result.vouchers[0].gross_profit, 12600.5);
        assert_eq!(result.vouchers[1].gross_profit, 7.0);
        assert_eq!(result.total_gross_profit, 12607.5);
        assert_eq!(
            serde_json::to_value(&result).unwrap()["totalGrossProfit"],
            json!(12607.5)
        );
    }

    #[test]
    fn gross_profit_overflow_is_an_error() {
        let input = voucher("v1")
            .with_transaction(tx("a").dated("2024-01-01").priced(f64::MAX))
            .with_transaction(tx("b").dated("2024-01-02").priced(f64::MAX));

        let err = TransactionAggregator::default()
            .aggregate(vec![input], &NoopDiagnostics)
            .unwrap_err();
        assert!(matches!(err, AggregationError::GrossProfitOverflow { .. }));
    }

    #[test]
    fn total_overflow_is_an_error() {
        let first = voucher("v1")
            .with_transaction(tx("a").dated("2024-01-01").priced(f64::MAX));
        let second = voucher("v2")
            .with_transaction(tx("b").dated("2024-01-02").priced(f64::MAX));

        let err = TransactionAggregator::default()
            .aggregate(vec![first, second], &NoopDiagnostics)
            .unwrap_err();
        assert_eq!(err, AggregationError::TotalOverflow);
    }

    #[test]
    fn serializes_in_document_shape() {
        let input = voucher("v1")
            .with_field("name", json!("Voucher 10GB"))
            .with_field("grossProfit", json!(999))
            .with_transaction(tx("t1").dated("2024-01-01T00:00:00Z").priced(10.0));

        let result = TransactionAggregator::default()
            .aggregate(vec![input], &NoopDiagnostics)
            .unwrap();

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "vouchers": [{
                    "_id": "v1",
                    "sign": "SHOP-1",
                    "name": "Voucher 10GB",
                    "grossProfit": 10,
                    "historyTransaksi": [{
                        "_id": "t1",
                        "date": "2024-01-01T00:00:00Z",
                        "details": { "price": 10 },
                        "formattedDate": "2024-01-01 07:00:00"
                    }]
                }],
                "totalGrossProfit": 10
            })
        );
    }

    fn base_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
    }

    fn build_vouchers(layout: &[Vec<(Option<i64>, Option<i64>)>]) -> Vec<Voucher> {
        layout
            .iter()
            .enumerate()
            .map(|(vi, txs)| {
                txs.iter().enumerate().fold(
                    voucher(&format!("v{vi}")),
                    |v, (ti, (minutes, price))| {
                        let mut t = tx(&format!("v{vi}-t{ti}"));
                        if let Some(m) = minutes {
                            t = t.dated(base_instant() + Duration::minutes(*m));
                        }
                        if let Some(p) = price {
                            t = t.priced(*p as f64);
                        }
                        v.with_transaction(t)
                    },
                )
            })
            .collect()
    }

    fn sort_order_strategy() -> impl Strategy<Value = SortOrder> {
        prop_oneof![Just(SortOrder::Asc), Just(SortOrder::Desc)]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the grand total is the sum of per-voucher gross profits,
        /// and retained dates follow the requested order.
        #[test]
        fn totals_add_up_and_dates_are_ordered(
            layout in prop::collection::vec(
                prop::collection::vec(
                    (
                        prop::option::of(0i64..1_051_200),
                        prop::option::of(-1_000_000i64..1_000_000),
                    ),
                    0..8,
                ),
                0..6,
            ),
            order in sort_order_strategy(),
            month in prop::option::of(1u32..=12),
        ) {
            let vouchers = build_vouchers(&layout);
            let expected_undated: usize = layout
                .iter()
                .flatten()
                .filter(|(minutes, _)| minutes.is_none())
                .count();

            let diagnostics = RecordingDiagnostics::new();
            let period = PeriodFilter::new(None, month).unwrap();
            let result = TransactionAggregator::new(order, period)
                .aggregate(vouchers, &diagnostics)
                .unwrap();

            prop_assert_eq!(result.vouchers.len(), layout.len());

            let sum = result.vouchers.iter().fold(0.0, |acc, v| acc + v.gross_profit);
            prop_assert_eq!(result.total_gross_profit, sum);

            for v in &result.vouchers {
                for t in &v.history {
                    prop_assert!(t.transaction.date.is_some());
                    prop_assert!(period.matches(&t.timestamp));
                }
                for pair in v.history.windows(2) {
                    match order {
                        SortOrder::Asc => {
                            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
                        }
                        SortOrder::Desc => {
                            prop_assert!(pair[0].timestamp >= pair[1].timestamp);
                        }
                    }
                }
            }

            let reported_undated = diagnostics
                .snapshot()
                .iter()
                .filter(|d| matches!(d, Diagnostic::InvalidTransactionDate { .. }))
                .count();
            prop_assert_eq!(reported_undated, expected_undated);
        }
    }
}
