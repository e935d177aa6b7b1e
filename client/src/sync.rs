use std::sync::Arc;

use futures::future::join_all;

use crate::error::ClientError;
use crate::gateway::LedgerGateway;
use crate::types::{Address, RefreshOutcome, RefreshStatus};

/// Produces the packet list callers render: the most recent window of the
/// registry, newest first, with per-viewer claim flags attached.
pub struct ListSynchronizer {
    gateway: Arc<LedgerGateway>,
}

impl ListSynchronizer {
    pub fn new(gateway: Arc<LedgerGateway>) -> Self {
        ListSynchronizer { gateway }
    }

    /// Rebuild the list from scratch. The anchor count read and the range
    /// fetch must both succeed; a registry with no packets is reported as
    /// `Empty` rather than an error. Claim-flag enrichment runs one read per
    /// record, overlapped, and absorbs individual failures as false.
    pub async fn refresh(
        &self,
        window: usize,
        viewer: Option<&Address>,
    ) -> Result<RefreshOutcome, ClientError> {
        if window == 0 {
            return Err(ClientError::validation("window must be at least 1"));
        }

        let total = self.gateway.fetch_total_count().await?;
        if total == 0 {
            tracing::debug!("registry holds no packets yet");
            return Ok(RefreshOutcome {
                records: Vec::new(),
                status: RefreshStatus::Empty,
            });
        }

        let (start, count) = window_bounds(total, window);
        let mut records = self.gateway.fetch_packet_range(start, count).await?;
        records.reverse();

        if let Some(viewer) = viewer {
            let flags = join_all(
                records
                    .iter()
                    .map(|record| self.gateway.has_claimed(record.id, viewer)),
            )
            .await;
            for (record, claimed) in records.iter_mut().zip(flags) {
                record.has_claimed = claimed;
            }
        }

        tracing::debug!("refreshed {} of {total} packets", records.len());
        Ok(RefreshOutcome {
            records,
            status: RefreshStatus::Loaded,
        })
    }
}

/// Last `window` positions of a registry holding `total` packets.
fn window_bounds(total: u64, window: usize) -> (u64, u64) {
    let count = (window as u64).min(total);
    (total - count, count)
}
