// RTMP protocol stack: constants, message model, chunk codec, handshake,
// and the typed packet layer built on AMF0.

mod chunk;
mod constants;
mod handshake;
mod message;
mod packet;

pub use chunk::*;
pub use constants::*;
pub use handshake::*;
pub use message::*;
pub use packet::*;
