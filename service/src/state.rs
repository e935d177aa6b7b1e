use std::sync::Arc;

use redpacket_client::{ConnectionManager, LedgerGateway, ListSynchronizer};

#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<ConnectionManager>,
    pub gateway: Arc<LedgerGateway>,
    pub lists: Arc<ListSynchronizer>,
    pub window: usize,
}
