// RTMP constants

// Chunk basic header formats
pub const RTMP_CHUNK_TYPE_0: u8 = 0; // 11-bytes: timestamp(3) + length(3) + type(1) + stream id(4, LE)
pub const RTMP_CHUNK_TYPE_1: u8 = 1; // 7-bytes: delta(3) + length(3) + type(1)
pub const RTMP_CHUNK_TYPE_2: u8 = 2; // 3-bytes: delta(3)
pub const RTMP_CHUNK_TYPE_3: u8 = 3; // 0-byte

/// Gets the message-header size (in bytes, excluding the basic header and
/// any extended timestamp) for a given chunk fmt
pub fn message_header_size(fmt: u8) -> usize {
    match fmt {
        0 => 11,
        1 => 7,
        2 => 3,
        _ => 0,
    }
}

/// Marker used by a 3-byte timestamp/delta field to signal that the real
/// value follows in a 4-byte extended timestamp field
pub const EXTENDED_TIMESTAMP_MARKER: u32 = 0x00FF_FFFF;

/// RTMP chunk stream IDs (CSIDs) reserved for specific control purposes
pub const RTMP_CHANNEL_PROTOCOL: u32 = 2;
pub const RTMP_CHANNEL_INVOKE: u32 = 3; // "over connection"
pub const RTMP_CHANNEL_INVOKE_2: u32 = 4; // "over connection 2"
pub const RTMP_CHANNEL_STREAM: u32 = 5; // "over stream"
pub const RTMP_CHANNEL_VIDEO: u32 = 6;
pub const RTMP_CHANNEL_AUDIO: u32 = 7;
pub const RTMP_CHANNEL_STREAM_2: u32 = 8; // "over stream 2"

// Message types

/* Protocol Control Messages */
pub const RTMP_TYPE_SET_CHUNK_SIZE: u8 = 1;
pub const RTMP_TYPE_ABORT: u8 = 2;
pub const RTMP_TYPE_ACKNOWLEDGEMENT: u8 = 3;
pub const RTMP_TYPE_WINDOW_ACK_SIZE: u8 = 5;
pub const RTMP_TYPE_SET_PEER_BANDWIDTH: u8 = 6;

/* User Control Message */
pub const RTMP_TYPE_USER_CONTROL: u8 = 4;

pub const RTMP_TYPE_AUDIO: u8 = 8;
pub const RTMP_TYPE_VIDEO: u8 = 9;

/* Data Message */
pub const RTMP_TYPE_AMF3_DATA: u8 = 15;
pub const RTMP_TYPE_AMF0_DATA: u8 = 18;

/* Shared Object Message */
pub const RTMP_TYPE_AMF3_SHARED: u8 = 16;
pub const RTMP_TYPE_AMF0_SHARED: u8 = 19;

/* Command Message */
pub const RTMP_TYPE_AMF3_COMMAND: u8 = 17;
pub const RTMP_TYPE_AMF0_COMMAND: u8 = 20;

/* Aggregate Message */
pub const RTMP_TYPE_AGGREGATE: u8 = 22;

// User Control Message event types

pub const STREAM_BEGIN: u16 = 0x00;
pub const STREAM_EOF: u16 = 0x01;
pub const STREAM_DRY: u16 = 0x02;
pub const STREAM_EMPTY: u16 = 0x1f;
pub const STREAM_READY: u16 = 0x20;

// Protocol-level defaults

pub const RTMP_DEFAULT_CHUNK_SIZE: usize = 128;
pub const RTMP_MIN_CHUNK_SIZE: usize = 128;
pub const RTMP_MAX_CHUNK_SIZE: usize = 65536;
pub const RTMP_SERVING_CHUNK_SIZE: usize = 60000;
pub const RTMP_DEFAULT_WINDOW_ACK_SIZE: u32 = 2_500_000;
pub const RTMP_DEFAULT_PEER_BANDWIDTH_TYPE: u8 = 2; // dynamic

pub const RTMP_VERSION: u8 = 3;
pub const RTMP_HANDSHAKE_SIG_SIZE: usize = 1536;

pub const DEFAULT_SID: u32 = 1;

pub const RTMP_PING_TIMEOUT_SECS: u64 = 60;

pub const SERVER_FMS_VERSION: &str = "FMS/3,5,3,888";
pub const SERVER_CAPABILITIES: f64 = 127.0;
pub const SERVER_MODE: f64 = 1.0;
