// RTMP message model

use super::{
    RTMP_CHANNEL_AUDIO, RTMP_CHANNEL_INVOKE, RTMP_CHANNEL_PROTOCOL, RTMP_CHANNEL_STREAM,
    RTMP_CHANNEL_VIDEO, RTMP_TYPE_AGGREGATE, RTMP_TYPE_AMF0_COMMAND, RTMP_TYPE_AMF0_DATA,
    RTMP_TYPE_AMF3_COMMAND, RTMP_TYPE_AUDIO, RTMP_TYPE_SET_CHUNK_SIZE, RTMP_TYPE_USER_CONTROL,
    RTMP_TYPE_VIDEO, RTMP_TYPE_WINDOW_ACK_SIZE,
};

/// A fully reassembled RTMP message: the unit the chunk codec produces on
/// ingress and consumes on egress
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    /// Message type byte (RTMP_TYPE_*)
    pub message_type: u8,

    /// Timestamp, clamped to 31 bits
    pub timestamp: i64,

    /// Stream ID the message belongs to
    pub stream_id: i32,

    /// Chunk stream ID to prefer when re-framing this message for egress
    pub preferred_chunk_stream_id: u32,

    /// Message payload
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a new message, choosing a sensible preferred CSID from the
    /// message type (mirrors the fixed channel assignment RTMP servers use:
    /// protocol control on 2, commands on 3, audio/video/data on their own
    /// channels)
    pub fn new(message_type: u8, timestamp: i64, stream_id: i32, payload: Vec<u8>) -> Message {
        let preferred_chunk_stream_id = default_preferred_csid(message_type);

        Message {
            message_type,
            timestamp,
            stream_id,
            preferred_chunk_stream_id,
            payload,
        }
    }

    /// True if this message type is handled in-line by the chunk codec and
    /// never delivered to the stage driver
    pub fn is_protocol_control(&self) -> bool {
        matches!(
            self.message_type,
            RTMP_TYPE_SET_CHUNK_SIZE
                | super::RTMP_TYPE_ACKNOWLEDGEMENT
                | RTMP_TYPE_WINDOW_ACK_SIZE
                | super::RTMP_TYPE_SET_PEER_BANDWIDTH
        )
    }

    /// True if this is an AMF0/AMF3 command or data message
    pub fn is_command(&self) -> bool {
        matches!(
            self.message_type,
            RTMP_TYPE_AMF0_COMMAND | RTMP_TYPE_AMF3_COMMAND | RTMP_TYPE_AMF0_DATA | super::RTMP_TYPE_AMF3_DATA
        )
    }

    /// True if this is a User Control event
    pub fn is_user_control(&self) -> bool {
        self.message_type == RTMP_TYPE_USER_CONTROL
    }

    /// True for audio/video/data/aggregate media payload
    pub fn is_media(&self) -> bool {
        matches!(
            self.message_type,
            RTMP_TYPE_AUDIO | RTMP_TYPE_VIDEO | RTMP_TYPE_AGGREGATE | RTMP_TYPE_AMF0_DATA | super::RTMP_TYPE_AMF3_DATA
        )
    }
}

fn default_preferred_csid(message_type: u8) -> u32 {
    match message_type {
        RTMP_TYPE_AUDIO => RTMP_CHANNEL_AUDIO,
        RTMP_TYPE_VIDEO => RTMP_CHANNEL_VIDEO,
        RTMP_TYPE_AMF0_COMMAND | RTMP_TYPE_AMF3_COMMAND => RTMP_CHANNEL_INVOKE,
        RTMP_TYPE_AMF0_DATA | super::RTMP_TYPE_AMF3_DATA | RTMP_TYPE_AGGREGATE => RTMP_CHANNEL_STREAM,
        RTMP_TYPE_SET_CHUNK_SIZE
        | super::RTMP_TYPE_ACKNOWLEDGEMENT
        | RTMP_TYPE_WINDOW_ACK_SIZE
        | super::RTMP_TYPE_SET_PEER_BANDWIDTH
        | RTMP_TYPE_USER_CONTROL => RTMP_CHANNEL_PROTOCOL,
        _ => RTMP_CHANNEL_INVOKE,
    }
}
