use std::sync::RwLock;

use async_trait::async_trait;

use voucherbook_core::{Entity, Sign};
use voucherbook_vouchers::Voucher;

use super::r#trait::{VoucherStore, VoucherStoreError};

/// In-memory voucher store.
///
/// Intended for tests/dev. [`InMemoryVoucherStore::fail_with`] makes every
/// subsequent lookup fail, which stands in for an unreachable database.
#[derive(Debug, Default)]
pub struct InMemoryVoucherStore {
    vouchers: RwLock<Vec<Voucher>>,
    failure: RwLock<Option<String>>,
}

impl InMemoryVoucherStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vouchers(vouchers: impl IntoIterator<Item = Voucher>) -> Self {
        Self {
            vouchers: RwLock::new(vouchers.into_iter().collect()),
            failure: RwLock::new(None),
        }
    }

    /// Insert a voucher, replacing any stored voucher with the same id in place.
    pub fn upsert(&self, voucher: Voucher) {
        if let Ok(mut vouchers) = self.vouchers.write() {
            match vouchers.iter_mut().find(|v| v.id() == voucher.id()) {
                Some(existing) => *existing = voucher,
                None => vouchers.push(voucher),
            }
        }
    }

    pub fn fail_with(&self, reason: impl Into<String>) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = Some(reason.into());
        }
    }

    pub fn recover(&self) {
        if let Ok(mut failure) = self.failure.write() {
            *failure = None;
        }
    }
}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    async fn find_by_sign(&self, sign: &Sign) -> Result<Vec<Voucher>, VoucherStoreError> {
        let failure = self
            .failure
            .read()
            .map_err(|_| VoucherStoreError::Unavailable("failure switch poisoned".to_string()))?
            .clone();
        if let Some(reason) = failure {
            return Err(VoucherStoreError::Unavailable(reason));
        }

        let vouchers = self
            .vouchers
            .read()
            .map_err(|_| VoucherStoreError::Unavailable("voucher map poisoned".to_string()))?;

        Ok(vouchers
            .iter()
            .filter(|v| &v.sign == sign)
            .cloned()
            .collect())
    }
}
