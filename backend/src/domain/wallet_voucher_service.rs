//! Wallet voucher listing.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Page;

use crate::domain::Error;
use crate::domain::VoucherCard;
use crate::domain::ports::{VoucherPage, VoucherPageRequest, VoucherQuery, VoucherRepository};
use crate::domain::wallet_summary_service::map_voucher_error;

/// Service implementing [`VoucherQuery`].
pub struct WalletVoucherService<V> {
    vouchers: Arc<V>,
}

impl<V> Clone for WalletVoucherService<V> {
    fn clone(&self) -> Self {
        Self {
            vouchers: Arc::clone(&self.vouchers),
        }
    }
}

impl<V> WalletVoucherService<V> {
    /// Create the service.
    pub fn new(vouchers: Arc<V>) -> Self {
        Self { vouchers }
    }
}

#[async_trait]
impl<V> VoucherQuery for WalletVoucherService<V>
where
    V: VoucherRepository,
{
    async fn list_vouchers(&self, request: VoucherPageRequest) -> Result<VoucherPage, Error> {
        let rows = self
            .vouchers
            .list(&request.user_id, request.status, request.cursor, request.limit)
            .await
            .map_err(map_voucher_error)?;
        Ok(Page::from_overfetch(rows, request.limit, |card: &VoucherCard| card.id))
    }
}
