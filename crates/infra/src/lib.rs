//! Infrastructure layer: voucher stores, query services, config, logging bridge.

pub mod config;
pub mod diagnostics;
pub mod queries;
pub mod voucher_store;

pub use config::{ConfigError, InfraConfig};
pub use diagnostics::TracingDiagnostics;
pub use queries::{QueryFailure, QueryOutcome, VoucherTransactionsQuery};
pub use voucher_store::{
    InMemoryVoucherStore, JsonFileVoucherStore, PostgresVoucherStore, VoucherStore,
    VoucherStoreError,
};
