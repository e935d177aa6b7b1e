pub const DEFAULT_REGISTRY_RPC_URL: &str = "http://localhost:8545";
pub const DEFAULT_AGENT_RPC_URL: &str = "http://localhost:8546";
pub const DEFAULT_CHAIN_ID: u64 = 1337;

/// Registry operations (wire names)
pub const OP_CREATE: &str = "createRedPacket";
pub const OP_CLAIM: &str = "claimRedPacket";
pub const OP_PACKET_INFO: &str = "getPacketInfo";
pub const OP_HAS_CLAIMED: &str = "hasClaimed";
pub const OP_TOTAL_PACKETS: &str = "getTotalPackets";
pub const OP_PACKET_LIST: &str = "getPacketList";

/// Registry events scanned out of confirmations
pub const EVENT_PACKET_CREATED: &str = "PacketCreated";
pub const EVENT_PACKET_CLAIMED: &str = "PacketClaimed";
pub const EVENT_FIELD_PACKET_ID: &str = "packetId";
pub const EVENT_FIELD_AMOUNT: &str = "amount";

/// Gas allowances for state-changing calls
pub const GAS_LIMIT_CREATE: u64 = 300_000;
pub const GAS_LIMIT_CLAIM: u64 = 200_000;

/// Validation bounds
pub const MIN_PACKET_COUNT: u32 = 1;
pub const MAX_PACKET_COUNT: u32 = 100;
pub const MAX_MESSAGE_CHARS: usize = 100;

/// Blessing used when the creator leaves the message empty
pub const DEFAULT_MESSAGE: &str = "恭喜发财！";

/// Fraction digits between a base unit and a display unit
pub const DISPLAY_DECIMALS: u32 = 18;

/// Agent-side code for a user refusing a prompt
pub const AGENT_REJECTED_CODE: i32 = 4001;

/// Polling cadence and per-request timeout for the HTTP adapters
pub const RECEIPT_POLL_MS: u64 = 1_000;
pub const AGENT_POLL_MS: u64 = 2_000;
pub const HTTP_TIMEOUT_SECS: u64 = 30;
