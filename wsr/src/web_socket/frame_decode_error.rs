/// Reasons a sequence of bytes could not be turned into a text frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameDecodeError {
  /// Frame is not final. Continuation frames are not supported.
  Fragmented,
  /// Declared payload length differs from the number of bytes that follow the mask.
  LengthMismatch {
    /// Length written in the header.
    declared: u64,
    /// Number of payload bytes actually present.
    received: usize,
  },
  /// Server received a frame without a mask.
  MissingMask,
  /// Frame payload exceeds the defined threshold.
  PayloadTooLarge {
    /// Length written in the header.
    declared: u64,
    /// Configured threshold.
    max: usize,
  },
  /// Reserved bits are not zero.
  ReservedBitsAreNotZero,
  /// There are not enough bytes to hold the header.
  Truncated,
  /// Only text frames are accepted.
  UnsupportedOpcode {
    /// Received op code.
    provided: u8,
  },
}

impl FrameDecodeError {
  /// Ignorable failures drop the frame but keep the connection open.
  #[inline]
  pub fn is_fatal(self) -> bool {
    !matches!(self, Self::Fragmented | Self::UnsupportedOpcode { .. })
  }
}
