// Error taxonomy
//
// Every error that can end a connection boils down to one of these kinds.
// FlowControl ("drop one message, continue") and StageControl ("re-enter
// identify") are not modeled here because they never end the connection:
// FlowControl is handled inline by the egress/consumer try_send call sites,
// and StageControl is a `StageSignal::Republish` return value (see
// `session::stage`), not a `Result::Err`.

use std::fmt;

/// Top level error for the RTMP core
#[derive(Debug)]
pub enum RtmpError {
    /// TCP read/write failure or premature EOF
    Transport(std::io::Error),

    /// Chunk framing violated an invariant (bad basic header, fmt=0 required,
    /// payload length changed mid-message, ...)
    ProtocolFraming(&'static str),

    /// AMF0 decoding failed (bad marker, short buffer)
    CodecFormat(String),

    /// The connect request was structurally invalid (missing tcUrl, empty
    /// vhost/app, non-positive port)
    RequestInvalid(String),

    /// C0 was not version 3
    HandshakePlainRequired,

    /// Handshake read ended before the expected number of bytes arrived
    HandshakeShortRead,
}

impl fmt::Display for RtmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtmpError::Transport(e) => write!(f, "transport error: {e}"),
            RtmpError::ProtocolFraming(msg) => write!(f, "protocol framing error: {msg}"),
            RtmpError::CodecFormat(msg) => write!(f, "codec format error: {msg}"),
            RtmpError::RequestInvalid(msg) => write!(f, "invalid request: {msg}"),
            RtmpError::HandshakePlainRequired => {
                write!(f, "handshake error: only the plain (simple) handshake is supported")
            }
            RtmpError::HandshakeShortRead => write!(f, "handshake error: short read"),
        }
    }
}

impl std::error::Error for RtmpError {}

impl From<std::io::Error> for RtmpError {
    fn from(e: std::io::Error) -> Self {
        RtmpError::Transport(e)
    }
}

impl From<crate::amf::AmfError> for RtmpError {
    fn from(e: crate::amf::AmfError) -> Self {
        RtmpError::CodecFormat(e.to_string())
    }
}
