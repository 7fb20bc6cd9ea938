use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::instrument;

use voucherbook_core::Sign;
use voucherbook_vouchers::Voucher;

use super::r#trait::{VoucherStore, VoucherStoreError};

/// Voucher store backed by a document export on disk.
///
/// Accepts either a JSON array of voucher documents or one document per line
/// (the two shapes document-store export tools produce). The file is re-read
/// on every lookup so an updated export is picked up without restarting.
#[derive(Debug, Clone)]
pub struct JsonFileVoucherStore {
    path: PathBuf,
}

impl JsonFileVoucherStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn parse_documents(contents: &str) -> Result<Vec<JsonValue>, VoucherStoreError> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| VoucherStoreError::Malformed(format!("export is not a JSON array: {e}")));
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|e| {
                VoucherStoreError::Malformed(format!("line {}: {e}", idx + 1))
            })
        })
        .collect()
}

#[async_trait]
impl VoucherStore for JsonFileVoucherStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn find_by_sign(&self, sign: &Sign) -> Result<Vec<Voucher>, VoucherStoreError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| VoucherStoreError::Io(format!("{}: {e}", self.path.display())))?;

        parse_documents(&contents)?
            .into_iter()
            .filter(|doc| doc.get("sign").and_then(JsonValue::as_str) == Some(sign.as_str()))
            .map(|doc| {
                serde_json::from_value::<Voucher>(doc)
                    .map_err(|e| VoucherStoreError::Malformed(e.to_string()))
            })
            .collect()
    }
}
