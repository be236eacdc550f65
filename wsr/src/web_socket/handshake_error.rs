/// Reasons an opening handshake could not be negotiated.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandshakeError {
  /// The request head is not terminated by an empty line.
  IncompleteRequest,
  /// The request head is not valid HTTP.
  MalformedRequest(httparse::Error),
  /// `Sec-WebSocket-Key` is absent or empty.
  MissingKey,
  /// The request head exceeds the configured threshold.
  RequestTooLarge {
    /// Configured threshold.
    max: usize,
  },
}
