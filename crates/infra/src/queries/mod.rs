//! Read-path query services.

pub mod voucher_transactions;

pub use voucher_transactions::{QueryFailure, QueryOutcome, VoucherTransactionsQuery};
