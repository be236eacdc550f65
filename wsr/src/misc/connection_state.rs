/// Lifecycle of a connection.
///
/// `Connecting` until registered, `Open` while registered, `Closed` afterwards. `Closed` is
/// terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionState {
  /// Negotiating the opening handshake.
  Connecting,
  /// Present in the registry.
  Open,
  /// Removed from the registry.
  Closed,
}

impl ConnectionState {
  /// Shortcut for [ConnectionState::Closed].
  #[inline]
  pub fn is_closed(self) -> bool {
    matches!(self, Self::Closed)
  }

  /// Shortcut for [ConnectionState::Open].
  #[inline]
  pub fn is_open(self) -> bool {
    matches!(self, Self::Open)
  }
}

impl From<ConnectionState> for u8 {
  #[inline]
  fn from(from: ConnectionState) -> Self {
    match from {
      ConnectionState::Connecting => 0,
      ConnectionState::Open => 1,
      ConnectionState::Closed => 2,
    }
  }
}

impl From<u8> for ConnectionState {
  #[inline]
  fn from(from: u8) -> Self {
    match from {
      0 => Self::Connecting,
      1 => Self::Open,
      _ => Self::Closed,
    }
  }
}
