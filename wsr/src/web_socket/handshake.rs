
use crate::web_socket::HandshakeError;
use base64::{Engine, engine::general_purpose::STANDARD};
use httparse::{EMPTY_HEADER, Request, Status};
use sha1::{Digest, Sha1};

const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";
const MAX_HEADERS: usize = 64;

/// Successfully negotiated opening handshake.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Handshake {
  accept: String,
  consumed: usize,
  host: Option<String>,
  target: String,
}

impl Handshake {
  /// Value of `Sec-WebSocket-Accept`.
  #[inline]
  pub fn accept(&self) -> &str {
    &self.accept
  }

  /// Number of request bytes that belong to the head. Anything after it is frame data.
  #[inline]
  pub fn consumed(&self) -> usize {
    self.consumed
  }

  /// Value of the `Host` header, if any.
  #[inline]
  pub fn host(&self) -> Option<&str> {
    self.host.as_deref()
  }

  /// Value of the `room` query parameter. Empty values are treated as absent.
  #[inline]
  pub fn room(&self) -> Option<&str> {
    let (_, query) = self.target.split_once('?')?;
    query
      .split('&')
      .find_map(|pair| {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        (name == "room").then_some(value)
      })
      .filter(|el| !el.is_empty())
  }

  /// Request target of the `GET` line. Empty when absent.
  #[inline]
  pub fn target(&self) -> &str {
    &self.target
  }

  /// Bytes of the `101 Switching Protocols` response.
  #[inline]
  pub fn response(&self) -> Vec<u8> {
    format!(
      "HTTP/1.1 101 Switching Protocols\r\n\
       Upgrade: websocket\r\n\
       Connection: Upgrade\r\n\
       Sec-WebSocket-Accept: {}\r\n\r\n",
      self.accept
    )
    .into_bytes()
  }
}

/// `Sec-WebSocket-Accept` of a given `Sec-WebSocket-Key`.
#[inline]
pub fn derived_key(key: &[u8]) -> String {
  let mut sha1 = Sha1::new();
  sha1.update(key);
  sha1.update(GUID);
  STANDARD.encode(sha1.finalize())
}

/// Parses an upgrade request head located at the beginning of `bytes`.
#[inline]
pub fn negotiate(bytes: &[u8]) -> Result<Handshake, HandshakeError> {
  let mut headers = [EMPTY_HEADER; MAX_HEADERS];
  let mut req = Request::new(&mut headers);
  let consumed = match req.parse(bytes) {
    Ok(Status::Complete(elem)) => elem,
    Ok(Status::Partial) => return Err(HandshakeError::IncompleteRequest),
    Err(err) => return Err(HandshakeError::MalformedRequest(err)),
  };
  let target = if req.method == Some("GET") { req.path.unwrap_or_default() } else { "" };
  let mut host = None;
  let mut key = None;
  for header in req.headers.iter() {
    if header.name.eq_ignore_ascii_case("host") {
      host = Some(String::from_utf8_lossy(header.value.trim_ascii()).into_owned());
    } else if header.name.eq_ignore_ascii_case("sec-websocket-key") {
      key = Some(header.value.trim_ascii());
    }
  }
  let key = key.filter(|el| !el.is_empty()).ok_or(HandshakeError::MissingKey)?;
  Ok(Handshake { accept: derived_key(key), consumed, host, target: target.into() })
}
