use crate::web_socket::FrameDecodeError;

/// Defines how to interpret the payload data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum OpCode {
  /// Continuation of a previous frame.
  Continuation = 0b0000_0000,
  /// UTF-8 text.
  Text = 0b0000_0001,
  /// Opaque bytes.
  Binary = 0b0000_0010,
  /// Connection is closed.
  Close = 0b0000_1000,
  /// Test reachability.
  Ping = 0b0000_1001,
  /// Response of a ping frame.
  Pong = 0b0000_1010,
}

impl OpCode {
  /// Only text frames carry relayed messages.
  #[inline]
  pub fn is_text(self) -> bool {
    matches!(self, OpCode::Text)
  }
}

impl From<OpCode> for u8 {
  #[inline]
  fn from(from: OpCode) -> Self {
    from as u8
  }
}

impl TryFrom<u8> for OpCode {
  type Error = FrameDecodeError;

  #[inline]
  fn try_from(from: u8) -> Result<Self, Self::Error> {
    Ok(match from {
      0b0000_0000 => Self::Continuation,
      0b0000_0001 => Self::Text,
      0b0000_0010 => Self::Binary,
      0b0000_1000 => Self::Close,
      0b0000_1001 => Self::Ping,
      0b0000_1010 => Self::Pong,
      _ => return Err(FrameDecodeError::UnsupportedOpcode { provided: from }),
    })
  }
}

#[cfg(test)]
mod tests {
  use crate::web_socket::{FrameDecodeError, OpCode};

  #[test]
  fn reserved_op_codes_are_rejected() {
    for byte in [3, 4, 5, 6, 7, 11, 12, 13, 14, 15] {
      let err = FrameDecodeError::UnsupportedOpcode { provided: byte };
      assert_eq!(OpCode::try_from(byte), Err(err));
    }
  }

  #[test]
  fn known_op_codes_are_restored() {
    let all = [
      OpCode::Continuation,
      OpCode::Text,
      OpCode::Binary,
      OpCode::Close,
      OpCode::Ping,
      OpCode::Pong,
    ];
    for op_code in all {
      assert_eq!(OpCode::try_from(u8::from(op_code)), Ok(op_code));
    }
  }
}
