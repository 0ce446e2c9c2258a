//! Real-time WebSocket engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Per-connection outbound channel buffer size. Sends into a full
    /// buffer drop the frame rather than block the sender, so one slow
    /// consumer can never stall a broadcast.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Maximum inbound frame size in bytes.
    #[serde(default = "default_max_frame")]
    pub max_frame_bytes: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            max_frame_bytes: default_max_frame(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_max_frame() -> usize {
    64 * 1024
}
