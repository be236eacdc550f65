use crate::misc::FromVars;
use core::{
  fmt::{Debug, Formatter},
  net::{IpAddr, Ipv4Addr},
};
use std::path::{Path, PathBuf};

/// Port used when none is provided by the entry point.
pub const DEFAULT_PORT: u16 = 8090;

const DEFAULT_MAX_HANDSHAKE_LEN: usize = 8 * 1024;
const DEFAULT_READ_CHUNK_LEN: usize = 1024;

/// Parameters of a [`crate::Server`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerConfig {
  echo_to_sender: bool,
  host: IpAddr,
  max_handshake_len: usize,
  max_payload_len: usize,
  port: u16,
  read_chunk_len: usize,
  room_scoped_broadcast: bool,
  tls: Option<TlsConfig>,
}

impl ServerConfig {
  /// Listens on `0.0.0.0:<port>` without TLS.
  #[inline]
  pub fn new(port: u16) -> Self {
    Self {
      echo_to_sender: true,
      host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
      max_handshake_len: DEFAULT_MAX_HANDSHAKE_LEN,
      max_payload_len: crate::_MAX_PAYLOAD_LEN,
      port,
      read_chunk_len: DEFAULT_READ_CHUNK_LEN,
      room_scoped_broadcast: true,
      tls: None,
    }
  }

  /// Whether the sender of a message also receives it.
  #[inline]
  pub fn echo_to_sender(&self) -> bool {
    self.echo_to_sender
  }

  /// Listening address.
  #[inline]
  pub fn host(&self) -> IpAddr {
    self.host
  }

  /// Maximum number of bytes of an upgrade request head.
  #[inline]
  pub fn max_handshake_len(&self) -> usize {
    self.max_handshake_len
  }

  /// Maximum payload length of a received frame.
  #[inline]
  pub fn max_payload_len(&self) -> usize {
    self.max_payload_len
  }

  /// Listening port. Zero lets the system pick one.
  #[inline]
  pub fn port(&self) -> u16 {
    self.port
  }

  /// Number of bytes requested by each read.
  #[inline]
  pub fn read_chunk_len(&self) -> usize {
    self.read_chunk_len
  }

  /// Whether a sender that joined a room only reaches the members of that room.
  #[inline]
  pub fn room_scoped_broadcast(&self) -> bool {
    self.room_scoped_broadcast
  }

  /// See [`TlsConfig`].
  #[inline]
  pub fn tls(&self) -> Option<&TlsConfig> {
    self.tls.as_ref()
  }

  /// Sets [`Self::echo_to_sender`].
  #[inline]
  #[must_use]
  pub fn with_echo_to_sender(mut self, elem: bool) -> Self {
    self.echo_to_sender = elem;
    self
  }

  /// Sets [`Self::host`].
  #[inline]
  #[must_use]
  pub fn with_host(mut self, elem: IpAddr) -> Self {
    self.host = elem;
    self
  }

  /// Sets [`Self::max_handshake_len`]. Never lower than one.
  #[inline]
  #[must_use]
  pub fn with_max_handshake_len(mut self, elem: usize) -> Self {
    self.max_handshake_len = elem.max(1);
    self
  }

  /// Sets [`Self::max_payload_len`].
  #[inline]
  #[must_use]
  pub fn with_max_payload_len(mut self, elem: usize) -> Self {
    self.max_payload_len = elem;
    self
  }

  /// Sets [`Self::port`].
  #[inline]
  #[must_use]
  pub fn with_port(mut self, elem: u16) -> Self {
    self.port = elem;
    self
  }

  /// Sets [`Self::read_chunk_len`]. Never lower than one.
  #[inline]
  #[must_use]
  pub fn with_read_chunk_len(mut self, elem: usize) -> Self {
    self.read_chunk_len = elem.max(1);
    self
  }

  /// Sets [`Self::room_scoped_broadcast`].
  #[inline]
  #[must_use]
  pub fn with_room_scoped_broadcast(mut self, elem: bool) -> Self {
    self.room_scoped_broadcast = elem;
    self
  }

  /// Sets [`Self::tls`].
  #[inline]
  #[must_use]
  pub fn with_tls(mut self, elem: Option<TlsConfig>) -> Self {
    self.tls = elem;
    self
  }
}

impl Default for ServerConfig {
  #[inline]
  fn default() -> Self {
    Self::new(DEFAULT_PORT)
  }
}

impl FromVars for ServerConfig {
  #[inline]
  fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> crate::Result<Self> {
    let mut port = None;
    let mut host = None;
    let mut cert_path = None;
    let mut key_path = None;
    let mut passphrase = None;
    let mut max_payload_len = None;
    let mut read_chunk_len = None;
    let mut max_handshake_len = None;
    let mut echo_to_sender = None;
    let mut room_scoped_broadcast = None;
    for (key, value) in vars {
      match key.as_str() {
        "WSR_HOST" => host = Some(value.parse::<IpAddr>()?),
        "WSR_PORT" => port = Some(value.parse::<u16>()?),
        "WSR_TLS_CERT" => cert_path = Some(PathBuf::from(value)),
        "WSR_TLS_KEY" => key_path = Some(PathBuf::from(value)),
        "WSR_TLS_PASSPHRASE" => passphrase = Some(value),
        "WSR_MAX_PAYLOAD_LEN" => max_payload_len = Some(value.parse::<usize>()?),
        "WSR_READ_CHUNK_LEN" => read_chunk_len = Some(value.parse::<usize>()?),
        "WSR_MAX_HANDSHAKE_LEN" => max_handshake_len = Some(value.parse::<usize>()?),
        "WSR_ECHO_TO_SENDER" => echo_to_sender = Some(value.parse::<bool>()?),
        "WSR_ROOM_SCOPED_BROADCAST" => room_scoped_broadcast = Some(value.parse::<bool>()?),
        _ => {}
      }
    }
    let mut this = Self::new(port.ok_or_else(|| crate::Error::MissingVar("WSR_PORT".into()))?);
    if let Some(elem) = host {
      this = this.with_host(elem);
    }
    if let Some(elem) = max_payload_len {
      this = this.with_max_payload_len(elem);
    }
    if let Some(elem) = read_chunk_len {
      this = this.with_read_chunk_len(elem);
    }
    if let Some(elem) = max_handshake_len {
      this = this.with_max_handshake_len(elem);
    }
    if let Some(elem) = echo_to_sender {
      this = this.with_echo_to_sender(elem);
    }
    if let Some(elem) = room_scoped_broadcast {
      this = this.with_room_scoped_broadcast(elem);
    }
    if let Some(elem) = cert_path {
      this = this.with_tls(Some(TlsConfig { cert_path: elem, key_path, passphrase }));
    }
    Ok(this)
  }
}

/// PEM files used to wrap accepted connections with TLS.
#[derive(Clone, Eq, PartialEq)]
pub struct TlsConfig {
  cert_path: PathBuf,
  key_path: Option<PathBuf>,
  passphrase: Option<String>,
}

impl TlsConfig {
  /// Certificate chain file that also holds the private key.
  #[inline]
  pub fn new(cert_path: impl Into<PathBuf>) -> Self {
    Self { cert_path: cert_path.into(), key_path: None, passphrase: None }
  }

  /// Certificate chain file.
  #[inline]
  pub fn cert_path(&self) -> &Path {
    &self.cert_path
  }

  /// Separate private key file.
  #[inline]
  pub fn key_path(&self) -> Option<&Path> {
    self.key_path.as_deref()
  }

  /// Passphrase of the private key.
  #[inline]
  pub fn passphrase(&self) -> Option<&str> {
    self.passphrase.as_deref()
  }

  /// Sets [`Self::key_path`].
  #[inline]
  #[must_use]
  pub fn with_key_path(mut self, elem: Option<PathBuf>) -> Self {
    self.key_path = elem;
    self
  }

  /// Sets [`Self::passphrase`].
  #[inline]
  #[must_use]
  pub fn with_passphrase(mut self, elem: Option<String>) -> Self {
    self.passphrase = elem;
    self
  }
}

impl Debug for TlsConfig {
  #[inline]
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("TlsConfig")
      .field("cert_path", &self.cert_path)
      .field("key_path", &self.key_path)
      .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use crate::{
    Error, ServerConfig, TlsConfig,
    misc::{EnvVars, FromVars},
  };
  use core::net::{IpAddr, Ipv4Addr};

  fn vars(pairs: &[(&str, &str)]) -> crate::Result<ServerConfig> {
    ServerConfig::from_vars(pairs.iter().map(|(key, value)| ((*key).into(), (*value).into())))
  }

  #[test]
  fn defaults_listen_on_8090_everywhere() {
    let config = ServerConfig::default();
    assert_eq!(config.port(), 8090);
    assert_eq!(config.host(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    assert_eq!(config.read_chunk_len(), 1024);
    assert_eq!(config.max_payload_len(), 64 * 1024 * 1024);
    assert!(config.echo_to_sender());
    assert!(config.room_scoped_broadcast());
    assert!(config.tls().is_none());
  }

  #[test]
  fn port_is_required() {
    assert!(matches!(vars(&[("WSR_HOST", "127.0.0.1")]), Err(Error::MissingVar(_))));
  }

  #[test]
  fn every_variable_is_read() {
    let config = vars(&[
      ("WSR_HOST", "127.0.0.1"),
      ("WSR_PORT", "9000"),
      ("WSR_TLS_CERT", "cert.pem"),
      ("WSR_TLS_KEY", "key.pem"),
      ("WSR_TLS_PASSPHRASE", "secret"),
      ("WSR_MAX_PAYLOAD_LEN", "10"),
      ("WSR_READ_CHUNK_LEN", "0"),
      ("WSR_MAX_HANDSHAKE_LEN", "512"),
      ("WSR_ECHO_TO_SENDER", "false"),
      ("WSR_ROOM_SCOPED_BROADCAST", "false"),
      ("UNRELATED", "1"),
    ])
    .unwrap();
    assert_eq!(config.host(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    assert_eq!(config.port(), 9000);
    assert_eq!(config.max_payload_len(), 10);
    assert_eq!(config.read_chunk_len(), 1);
    assert_eq!(config.max_handshake_len(), 512);
    assert!(!config.echo_to_sender());
    assert!(!config.room_scoped_broadcast());
    let tls = config.tls().unwrap();
    assert_eq!(tls.cert_path().to_str(), Some("cert.pem"));
    assert_eq!(tls.key_path().and_then(|el| el.to_str()), Some("key.pem"));
    assert_eq!(tls.passphrase(), Some("secret"));
  }

  #[test]
  fn invalid_values_are_errors() {
    assert!(matches!(vars(&[("WSR_PORT", "port")]), Err(Error::ParseIntError(_))));
    assert!(matches!(vars(&[("WSR_PORT", "1"), ("WSR_HOST", "x")]), Err(Error::AddrParseError(_))));
    assert!(matches!(
      vars(&[("WSR_PORT", "1"), ("WSR_ECHO_TO_SENDER", "yes")]),
      Err(Error::ParseBoolError(_))
    ));
  }

  #[test]
  fn env_data_is_accepted() {
    let config = EnvVars::<ServerConfig>::from_env_data(b"WSR_PORT=7000\nWSR_TLS_CERT='a.pem'\n")
      .unwrap()
      .finish();
    assert_eq!(config.port(), 7000);
    assert_eq!(config.tls(), Some(&TlsConfig::new("a.pem")));
  }

  #[test]
  fn passphrases_are_not_printed() {
    let tls = TlsConfig::new("a.pem").with_passphrase(Some("secret".into()));
    assert!(!format!("{tls:?}").contains("secret"));
  }
}
