use crate::web_socket::{FIN_MASK, FrameDecodeError, MASK_MASK, OP_CODE_MASK, OpCode, PAYLOAD_MASK};

/// Parameters of a WebSocket frame header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
  first_byte: u8,
  header_len: u8,
  mask: Option<[u8; 4]>,
  payload_len: u64,
}

impl FrameHeader {
  /// Creates a new instance based on the beginning of `bytes`. Returns `None` if `bytes` does not
  /// contain the whole header, including the extended length and the mask.
  #[inline]
  pub fn parse(bytes: &[u8]) -> Option<Self> {
    let [a, b, rest @ ..] = bytes else {
      return None;
    };
    let length_code = b & PAYLOAD_MASK;
    let (mut header_len, payload_len, rest) = match length_code {
      126 => {
        let [c, d, rest @ ..] = rest else {
          return None;
        };
        (4u8, u64::from(u16::from_be_bytes([*c, *d])), rest)
      }
      127 => {
        let [c, d, e, f, g, h, i, j, rest @ ..] = rest else {
          return None;
        };
        (10, u64::from_be_bytes([*c, *d, *e, *f, *g, *h, *i, *j]), rest)
      }
      _ => (2, length_code.into(), rest),
    };
    let mut mask = None;
    if b & MASK_MASK != 0 {
      let [c, d, e, f, ..] = rest else {
        return None;
      };
      mask = Some([*c, *d, *e, *f]);
      header_len = header_len.wrapping_add(4);
    }
    Some(Self { first_byte: *a, header_len, mask, payload_len })
  }

  /// Indicates if this is the final frame in a message.
  #[inline]
  pub fn fin(&self) -> bool {
    self.first_byte & FIN_MASK != 0
  }

  /// Number of bytes used by the header, mask included.
  #[inline]
  pub fn header_len(&self) -> usize {
    self.header_len.into()
  }

  /// Masking key of client frames.
  #[inline]
  pub fn mask(&self) -> Option<[u8; 4]> {
    self.mask
  }

  /// See [`OpCode`].
  #[inline]
  pub fn op_code(&self) -> Result<OpCode, FrameDecodeError> {
    OpCode::try_from(self.first_byte & OP_CODE_MASK)
  }

  /// Length declared by the header, which is not necessarily the number of available bytes.
  #[inline]
  pub fn payload_len(&self) -> u64 {
    self.payload_len
  }
}
