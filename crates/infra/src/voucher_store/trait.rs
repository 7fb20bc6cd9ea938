use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use voucherbook_core::Sign;
use voucherbook_vouchers::Voucher;

/// Voucher store operation error.
///
/// These are **infrastructure errors** (reachability, document shape, file
/// access) as opposed to domain errors (validation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoucherStoreError {
    #[error("voucher store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed voucher document: {0}")]
    Malformed(String),

    #[error("voucher store io error: {0}")]
    Io(String),
}

/// Read access to voucher documents grouped by `sign`.
///
/// Implementations must:
/// - return only vouchers whose `sign` equals the requested one
/// - preserve the store's natural document order
/// - report a document that cannot be read as a [`Voucher`] as `Malformed`
///   instead of skipping it
#[async_trait]
pub trait VoucherStore: Send + Sync {
    async fn find_by_sign(&self, sign: &Sign) -> Result<Vec<Voucher>, VoucherStoreError>;
}

#[async_trait]
impl<S> VoucherStore for Arc<S>
where
    S: VoucherStore + ?Sized,
{
    async fn find_by_sign(&self, sign: &Sign) -> Result<Vec<Voucher>, VoucherStoreError> {
        (**self).find_by_sign(sign).await
    }
}
