//! A computer communications protocol, providing full-duplex communication channels over a single
//! TCP connection.
//!
//! Only the subset needed to relay text messages is implemented: unfragmented text frames, the
//! server side of the opening handshake and the three payload length encodings.
//!
//! <https://tools.ietf.org/html/rfc6455>

mod frame;
mod frame_decode_error;
mod frame_header;
mod handshake;
mod handshake_error;
mod op_code;
mod unmask;

pub use frame::{DecodedFrame, decode, encode, encode_masked, frame_len};
pub use frame_decode_error::FrameDecodeError;
pub use frame_header::FrameHeader;
pub use handshake::{Handshake, derived_key, negotiate};
pub use handshake_error::HandshakeError;
pub use op_code::OpCode;
pub use unmask::unmask;

const FIN_MASK: u8 = 0b1000_0000;
const MASK_MASK: u8 = 0b1000_0000;
const MAX_HEADER_LEN: usize = 14;
const OP_CODE_MASK: u8 = 0b0000_1111;
const PAYLOAD_MASK: u8 = 0b0111_1111;
const RSV_MASK: u8 = 0b0111_0000;
