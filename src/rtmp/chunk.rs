// Chunk stream codec: reassembles RTMP chunks into Messages and fragments
// Messages back into chunks for egress.
//
// Grounded on the basic-header/message-header layout used by
// `rtmp/packet.rs::serialize_basic_header` / `create_chunks_for_stream` in
// the teacher, generalized into a full decode path (the teacher's own
// read-side reassembly in `session/chunk_read.rs` was an unfinished stub).

use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::constants::*;
use super::message::Message;
use crate::error::RtmpError;

struct PartialMessage {
    message_type: u8,
    timestamp: u32,
    stream_id: i32,
    total_length: usize,
    payload: Vec<u8>,
}

/// Per-CSID decoder state, carried across chunks on that stream for the
/// lifetime of the connection
struct ChunkStream {
    cid: u32,
    last_timestamp: u32,
    last_delta: u32,
    last_message_length: usize,
    last_message_type: u8,
    last_message_stream_id: i32,
    last_had_extended_timestamp: bool,
    partial: Option<PartialMessage>,
    messages_received: u64,
}

impl ChunkStream {
    fn new(cid: u32) -> Self {
        ChunkStream {
            cid,
            last_timestamp: 0,
            last_delta: 0,
            last_message_length: 0,
            last_message_type: 0,
            last_message_stream_id: 0,
            last_had_extended_timestamp: false,
            partial: None,
            messages_received: 0,
        }
    }
}

/// Reassembles an RTMP chunk stream read from a connection's socket into
/// whole messages
pub struct ChunkDecoder {
    streams: HashMap<u32, ChunkStream>,
    in_chunk_size: usize,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        ChunkDecoder {
            streams: HashMap::new(),
            in_chunk_size: RTMP_DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn set_chunk_size(&mut self, size: usize) {
        self.in_chunk_size = size.max(1);
    }

    /// Reads chunks from `reader` until a full message has been reassembled
    pub async fn read_message<R>(&mut self, reader: &mut R) -> Result<Message, RtmpError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            let (fmt, cid) = read_basic_header(reader).await?;
            let stream = self.streams.entry(cid).or_insert_with(|| ChunkStream::new(cid));

            // Invariant (3): the first chunk a CSID ever emits must be
            // fmt=0, except the documented cid=2/fmt=1 librtmp ping workaround.
            if stream.messages_received == 0 && stream.partial.is_none() && fmt != RTMP_CHUNK_TYPE_0 {
                let tolerated = cid == RTMP_CHANNEL_PROTOCOL && fmt == RTMP_CHUNK_TYPE_1;
                if !tolerated {
                    return Err(RtmpError::ProtocolFraming("fresh chunk stream must open with fmt=0"));
                }
            }

            // Invariant (4): fmt=0 never arrives mid-message.
            if fmt == RTMP_CHUNK_TYPE_0 && stream.partial.is_some() {
                return Err(RtmpError::ProtocolFraming("unexpected fmt=0 on a continuation chunk"));
            }

            match fmt {
                RTMP_CHUNK_TYPE_0 => {
                    let mut hdr = [0u8; 11];
                    reader.read_exact(&mut hdr).await?;
                    let ts_field = u24_be(&hdr[0..3]);
                    let length = u24_be(&hdr[3..6]) as usize;
                    let message_type = hdr[6];
                    let stream_id = i32::from_le_bytes([hdr[7], hdr[8], hdr[9], hdr[10]]);

                    let extended = ts_field == EXTENDED_TIMESTAMP_MARKER;
                    let timestamp = if extended {
                        read_extended_timestamp(reader).await?
                    } else {
                        ts_field
                    };

                    stream.last_timestamp = timestamp;
                    stream.last_delta = 0;
                    stream.last_message_length = length;
                    stream.last_message_type = message_type;
                    stream.last_message_stream_id = stream_id;
                    stream.last_had_extended_timestamp = extended;
                    stream.partial = Some(PartialMessage {
                        message_type,
                        timestamp: clamp_31(timestamp),
                        stream_id,
                        total_length: length,
                        payload: Vec::with_capacity(length.min(1 << 20)),
                    });
                }
                RTMP_CHUNK_TYPE_1 => {
                    let mut hdr = [0u8; 7];
                    reader.read_exact(&mut hdr).await?;
                    let ts_field = u24_be(&hdr[0..3]);
                    let length = u24_be(&hdr[3..6]) as usize;
                    let message_type = hdr[6];

                    if stream.last_message_length != 0 && length != stream.last_message_length && stream.partial.is_some() {
                        return Err(RtmpError::ProtocolFraming("payload length changed mid-message"));
                    }

                    let extended = ts_field == EXTENDED_TIMESTAMP_MARKER;
                    let delta = if extended {
                        read_extended_timestamp(reader).await?
                    } else {
                        ts_field
                    };
                    let timestamp = clamp_31(stream.last_timestamp.wrapping_add(delta));

                    stream.last_timestamp = timestamp;
                    stream.last_delta = delta;
                    stream.last_message_length = length;
                    stream.last_message_type = message_type;
                    stream.last_had_extended_timestamp = extended;
                    let stream_id = stream.last_message_stream_id;
                    stream.partial = Some(PartialMessage {
                        message_type,
                        timestamp,
                        stream_id,
                        total_length: length,
                        payload: Vec::with_capacity(length.min(1 << 20)),
                    });
                }
                RTMP_CHUNK_TYPE_2 => {
                    let mut hdr = [0u8; 3];
                    reader.read_exact(&mut hdr).await?;
                    let ts_field = u24_be(&hdr[0..3]);

                    let extended = ts_field == EXTENDED_TIMESTAMP_MARKER;
                    let delta = if extended {
                        read_extended_timestamp(reader).await?
                    } else {
                        ts_field
                    };
                    let timestamp = clamp_31(stream.last_timestamp.wrapping_add(delta));

                    stream.last_timestamp = timestamp;
                    stream.last_delta = delta;
                    stream.last_had_extended_timestamp = extended;
                    stream.partial = Some(PartialMessage {
                        message_type: stream.last_message_type,
                        timestamp,
                        stream_id: stream.last_message_stream_id,
                        total_length: stream.last_message_length,
                        payload: Vec::with_capacity(stream.last_message_length.min(1 << 20)),
                    });
                }
                _ => {
                    // fmt=3: continuation of an in-flight message, or a
                    // repeat of the previous header when nothing is in
                    // flight.
                    if stream.partial.is_none() {
                        let timestamp = clamp_31(stream.last_timestamp.wrapping_add(stream.last_delta));
                        stream.last_timestamp = timestamp;
                        stream.partial = Some(PartialMessage {
                            message_type: stream.last_message_type,
                            timestamp,
                            stream_id: stream.last_message_stream_id,
                            total_length: stream.last_message_length,
                            payload: Vec::with_capacity(stream.last_message_length.min(1 << 20)),
                        });
                    }

                    if stream.last_had_extended_timestamp {
                        // Property (7): a continuation chunk's extended
                        // timestamp field restates the message's absolute
                        // timestamp. If it disagrees with what we already
                        // derived, those 4 bytes were never a timestamp at
                        // all and belong to the payload instead.
                        let mut ext = [0u8; 4];
                        reader.read_exact(&mut ext).await?;
                        let ext_val = BigEndian::read_u32(&ext);
                        let partial = stream.partial.as_mut().expect("just populated");
                        if ext_val != stream.last_timestamp && stream.last_timestamp != 0 {
                            partial.payload.extend_from_slice(&ext);
                        }
                    }
                }
            }

            stream.messages_received += 1;

            let remaining = self.in_chunk_size;
            let partial = stream.partial.as_mut().expect("just populated");
            let need = partial.total_length.saturating_sub(partial.payload.len());
            let take = need.min(remaining);

            if take > 0 {
                let mut buf = vec![0u8; take];
                reader.read_exact(&mut buf).await?;
                partial.payload.extend_from_slice(&buf);
            }

            if partial.payload.len() >= partial.total_length {
                let finished = stream.partial.take().expect("checked above");
                return Ok(Message::new(
                    finished.message_type,
                    finished.timestamp as i64,
                    finished.stream_id,
                    finished.payload,
                ));
            }
        }
    }
}

async fn read_basic_header<R>(reader: &mut R) -> Result<(u8, u32), RtmpError>
where
    R: AsyncRead + Unpin,
{
    let mut b0 = [0u8; 1];
    reader.read_exact(&mut b0).await?;
    let fmt = (b0[0] & 0xC0) >> 6;
    let low = b0[0] & 0x3F;

    let cid = match low {
        0 => {
            let mut b1 = [0u8; 1];
            reader.read_exact(&mut b1).await?;
            64 + b1[0] as u32
        }
        1 => {
            let mut b = [0u8; 2];
            reader.read_exact(&mut b).await?;
            64 + b[0] as u32 + (b[1] as u32) * 256
        }
        n => n as u32,
    };

    Ok((fmt, cid))
}

async fn read_extended_timestamp<R>(reader: &mut R) -> Result<u32, RtmpError>
where
    R: AsyncRead + Unpin,
{
    let mut ext = [0u8; 4];
    reader.read_exact(&mut ext).await?;
    Ok(BigEndian::read_u32(&ext))
}

fn clamp_31(v: u32) -> u32 {
    v & 0x7FFF_FFFF
}

fn u24_be(b: &[u8]) -> u32 {
    ((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32)
}

fn write_u24_be(out: &mut Vec<u8>, v: u32) {
    out.push(((v >> 16) & 0xFF) as u8);
    out.push(((v >> 8) & 0xFF) as u8);
    out.push((v & 0xFF) as u8);
}

fn encode_basic_header(out: &mut Vec<u8>, fmt: u8, cid: u32) {
    if cid < 64 {
        out.push((fmt << 6) | (cid as u8));
    } else if cid < 320 {
        out.push(fmt << 6);
        out.push((cid - 64) as u8);
    } else {
        out.push((fmt << 6) | 0x01);
        let v = cid - 64;
        out.push((v & 0xFF) as u8);
        out.push(((v >> 8) & 0xFF) as u8);
    }
}

/// Splits `message` into chunks of at most `out_chunk_size` payload bytes,
/// writing an fmt=0 header on the first chunk and fmt=3 continuations after.
/// Extended timestamps are emitted on the fmt=0 chunk and repeated on every
/// fmt=3 continuation of the same message when timestamp ≥ 0x00FFFFFF.
pub fn encode_message(message: &Message, out_chunk_size: usize) -> Vec<u8> {
    let cid = message.preferred_chunk_stream_id;
    let out_chunk_size = out_chunk_size.max(1);
    let mut out = Vec::with_capacity(message.payload.len() + message.payload.len() / out_chunk_size * 16 + 16);

    let timestamp = clamp_31(message.timestamp.max(0) as u32);
    let extended = timestamp >= EXTENDED_TIMESTAMP_MARKER;
    let ts_field = if extended { EXTENDED_TIMESTAMP_MARKER } else { timestamp };

    encode_basic_header(&mut out, RTMP_CHUNK_TYPE_0, cid);
    write_u24_be(&mut out, ts_field);
    write_u24_be(&mut out, message.payload.len() as u32);
    out.push(message.message_type);
    out.extend_from_slice(&message.stream_id.to_le_bytes());
    if extended {
        let mut ext = [0u8; 4];
        BigEndian::write_u32(&mut ext, timestamp);
        out.extend_from_slice(&ext);
    }

    let mut offset = 0;
    let mut first = true;
    while offset < message.payload.len() || first {
        let end = (offset + out_chunk_size).min(message.payload.len());
        if !first {
            encode_basic_header(&mut out, RTMP_CHUNK_TYPE_3, cid);
            if extended {
                let mut ext = [0u8; 4];
                BigEndian::write_u32(&mut ext, timestamp);
                out.extend_from_slice(&ext);
            }
        }
        out.extend_from_slice(&message.payload[offset..end]);
        offset = end;
        first = false;
        if message.payload.is_empty() {
            break;
        }
    }

    out
}

/// Writes an encoded message directly to an async writer
pub async fn write_message<W>(writer: &mut W, message: &Message, out_chunk_size: usize) -> Result<(), RtmpError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = encode_message(message, out_chunk_size);
    writer.write_all(&bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    async fn round_trip(message: Message, out_chunk_size: usize) -> Message {
        let encoded = encode_message(&message, out_chunk_size);
        let mut cursor = std::io::Cursor::new(encoded);
        let mut decoder = ChunkDecoder::new();
        decoder.set_chunk_size(out_chunk_size);
        decoder.read_message(&mut cursor).await.unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_small_message() {
        let msg = Message::new(RTMP_TYPE_AUDIO, 100, 1, vec![0x00, 0xFF, 0x10]);
        let got = round_trip(msg.clone(), RTMP_DEFAULT_CHUNK_SIZE).await;
        assert_eq!(got.message_type, msg.message_type);
        assert_eq!(got.stream_id, msg.stream_id);
        assert_eq!(got.timestamp, msg.timestamp);
        assert_eq!(got.payload, msg.payload);
    }

    #[tokio::test]
    async fn round_trips_a_message_spanning_multiple_chunks() {
        let payload: Vec<u8> = (0..500u32).map(|i| (i % 256) as u8).collect();
        let msg = Message::new(RTMP_TYPE_VIDEO, 12345, 1, payload.clone());
        let got = round_trip(msg, 128).await;
        assert_eq!(got.payload, payload);
    }

    #[tokio::test]
    async fn extended_timestamp_boundary_round_trips_exactly() {
        let msg = Message::new(RTMP_TYPE_AUDIO, EXTENDED_TIMESTAMP_MARKER as i64, 1, vec![1, 2, 3]);
        let got = round_trip(msg, RTMP_DEFAULT_CHUNK_SIZE).await;
        assert_eq!(got.timestamp, EXTENDED_TIMESTAMP_MARKER as i64);
    }

    #[tokio::test]
    async fn fresh_chunk_stream_must_open_with_fmt0() {
        let (mut tx, mut rx) = duplex(64);
        tokio::spawn(async move {
            // fmt=1 on cid=10, never seen before -> must error
            tx.write_all(&[(1u8 << 6) | 10u8]).await.unwrap();
            tx.write_all(&[0, 0, 0, 0, 0, 0, 0]).await.unwrap();
            tx.flush().await.unwrap();
        });
        let mut decoder = ChunkDecoder::new();
        let result = decoder.read_message(&mut rx).await;
        assert!(matches!(result, Err(RtmpError::ProtocolFraming(_))));
    }
}
