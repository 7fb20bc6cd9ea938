//! Read-only voucher store boundary.
//!
//! The document store owns voucher records; this module only knows how to ask
//! it for "every voucher with this `sign`". Adapters are injected into query
//! services explicitly, there is no process-wide connection.

pub mod in_memory;
pub mod json_file;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryVoucherStore;
pub use json_file::JsonFileVoucherStore;
pub use postgres::PostgresVoucherStore;
pub use r#trait::{VoucherStore, VoucherStoreError};
