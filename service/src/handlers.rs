use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use redpacket_client::amount;
use redpacket_client::types::{
    ConnectionState, ConnectionStatus, DistributionMode, PacketInfo, PacketRecord, RefreshStatus,
};
use redpacket_client::ErrorInfo;

use crate::error::AppError;
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

// ============================================================
// Wallet
// ============================================================

#[derive(Serialize)]
pub struct WalletView {
    pub status: ConnectionStatus,
    pub account: Option<String>,
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
}

impl WalletView {
    fn new(state: ConnectionState, balance: Option<String>) -> Self {
        WalletView {
            status: state.status,
            account: state.account.map(|account| account.to_string()),
            chain_id: state.chain_id,
            balance,
            last_error: state.last_error,
        }
    }
}

pub async fn wallet_status(State(app): State<AppState>) -> Json<WalletView> {
    let snapshot = app.connection.snapshot();
    let balance = match &snapshot.account {
        Some(account) => Some(app.connection.get_balance(account).await),
        None => None,
    };
    Json(WalletView::new(snapshot, balance))
}

pub async fn wallet_connect(State(app): State<AppState>) -> Result<Json<WalletView>, AppError> {
    let state = app.connection.connect().await?;
    Ok(Json(WalletView::new(state, None)))
}

pub async fn wallet_resume(State(app): State<AppState>) -> Result<Json<WalletView>, AppError> {
    let state = app.connection.resume().await?;
    Ok(Json(WalletView::new(state, None)))
}

pub async fn wallet_disconnect(State(app): State<AppState>) -> Json<WalletView> {
    Json(WalletView::new(app.connection.disconnect(), None))
}

pub async fn wallet_switch(State(app): State<AppState>) -> Result<Json<WalletView>, AppError> {
    let state = app.connection.request_account_switch().await?;
    Ok(Json(WalletView::new(state, None)))
}

// ============================================================
// Packets
// ============================================================

#[derive(Serialize)]
pub struct PacketView {
    pub id: u64,
    pub creator: String,
    pub creator_short: String,
    pub total_amount: String,
    pub remain_count: u32,
    pub total_count: u32,
    pub message: String,
    pub is_active: bool,
    pub mode: DistributionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,
    pub has_claimed: bool,
}

impl From<PacketRecord> for PacketView {
    fn from(record: PacketRecord) -> Self {
        PacketView {
            id: record.id,
            creator_short: record.creator.short(),
            creator: record.creator.to_string(),
            total_amount: amount::format_base_units(record.total_amount),
            remain_count: record.remain_count,
            total_count: record.total_count,
            message: record.message,
            is_active: record.is_active,
            mode: record.mode,
            created_at: record.created_at,
            has_claimed: record.has_claimed,
        }
    }
}

#[derive(Serialize)]
pub struct ListView {
    pub status: RefreshStatus,
    pub packets: Vec<PacketView>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub window: Option<usize>,
}

pub async fn packets_list(
    State(app): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListView>, AppError> {
    let window = query.window.unwrap_or(app.window);
    let viewer = app.connection.snapshot().account;
    let outcome = app.lists.refresh(window, viewer.as_ref()).await?;
    Ok(Json(ListView {
        status: outcome.status,
        packets: outcome.records.into_iter().map(PacketView::from).collect(),
    }))
}

#[derive(Deserialize)]
pub struct CreateRequest {
    pub count: u32,
    #[serde(default)]
    pub message: String,
    pub mode: DistributionMode,
    pub total_amount: String,
}

#[derive(Serialize)]
pub struct CreateView {
    pub transaction_id: String,
    pub packet_id: Option<u64>,
}

pub async fn packets_create(
    State(app): State<AppState>,
    Json(request): Json<CreateRequest>,
) -> Result<Json<CreateView>, AppError> {
    let outcome = app
        .gateway
        .create_packet(
            request.count,
            &request.message,
            request.mode,
            &request.total_amount,
        )
        .await?;
    Ok(Json(CreateView {
        transaction_id: outcome.transaction_id,
        packet_id: outcome.value,
    }))
}

#[derive(Serialize)]
pub struct ClaimView {
    pub transaction_id: String,
    pub amount: Option<String>,
}

pub async fn packets_claim(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ClaimView>, AppError> {
    let outcome = app.gateway.claim_packet(id).await?;
    Ok(Json(ClaimView {
        transaction_id: outcome.transaction_id,
        amount: outcome.value,
    }))
}

#[derive(Serialize)]
pub struct PacketDetailView {
    pub creator: String,
    pub creator_short: String,
    pub total_amount: String,
    pub remain_amount: String,
    pub total_count: u32,
    pub remain_count: u32,
    pub message: String,
    pub is_active: bool,
    pub created_at: u64,
    pub mode: DistributionMode,
}

impl From<PacketInfo> for PacketDetailView {
    fn from(info: PacketInfo) -> Self {
        PacketDetailView {
            creator_short: info.creator.short(),
            creator: info.creator.to_string(),
            total_amount: amount::format_base_units(info.total_amount),
            remain_amount: amount::format_base_units(info.remain_amount),
            total_count: info.total_count,
            remain_count: info.remain_count,
            message: info.message,
            is_active: info.is_active,
            created_at: info.created_at,
            mode: info.mode,
        }
    }
}

pub async fn packet_detail(
    State(app): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<PacketDetailView>, AppError> {
    match app.gateway.packet_info(id).await {
        Some(info) => Ok(Json(PacketDetailView::from(info))),
        None => Err(AppError::NotFound(format!("packet {id}"))),
    }
}
