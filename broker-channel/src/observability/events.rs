//! Canonical structured event names used across `broker-channel`.

// Connection lifecycle events.
pub const CONNECT_START: &str = "connect_start";
pub const CONNECT_OK: &str = "connect_ok";
pub const CONNECT_FAILED: &str = "connect_failed";
pub const CHANNEL_CREATE_FAILED: &str = "channel_create_failed";
pub const CONNECTION_CLOSE_FAILED: &str = "connection_close_failed";

// Topology assertion events.
pub const TOPOLOGY_ASSERT_START: &str = "topology_assert_start";
pub const TOPOLOGY_ASSERT_OK: &str = "topology_assert_ok";
pub const TOPOLOGY_CONFIG_INVALID: &str = "topology_config_invalid";
pub const TOPOLOGY_RPC_FAILED: &str = "topology_rpc_failed";
pub const CHANNEL_CLOSE_FAILED: &str = "channel_close_failed";

// Channel events.
pub const CHANNEL_ERROR: &str = "channel_error";
pub const CHANNEL_BLOCKED: &str = "channel_blocked";
pub const CHANNEL_UNBLOCKED: &str = "channel_unblocked";
pub const CHANNEL_CLOSED: &str = "channel_closed";

// Simplified operation events.
pub const WRITE_NACKED: &str = "write_nacked";
pub const WRITE_ENCODE_FAILED: &str = "write_encode_failed";
pub const DELIVERY_DECODE_FAILED: &str = "delivery_decode_failed";
pub const CONSUMER_CANCELLED: &str = "consumer_cancelled";

// Supervisor events.
pub const SUPERVISOR_CONNECTION_LOST: &str = "supervisor_connection_lost";
pub const SUPERVISOR_RECONNECT_SKIPPED: &str = "supervisor_reconnect_skipped";
pub const SUPERVISOR_BACKOFF: &str = "supervisor_backoff";
pub const SUPERVISOR_RECONNECT_OK: &str = "supervisor_reconnect_ok";
pub const SUPERVISOR_RECONNECT_FAILED: &str = "supervisor_reconnect_failed";
pub const SUPERVISOR_SHUTDOWN: &str = "supervisor_shutdown";
pub const SUPERVISOR_SIGNAL: &str = "supervisor_signal";
pub const SUPERVISOR_SIGNAL_INSTALL_FAILED: &str = "supervisor_signal_install_failed";
