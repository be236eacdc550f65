
use crate::{
  BroadcastScope, ConnId, ConnMeta, DisconnectReason, Event, Peer, Registry, Reporter, RoomId,
  ServerConfig, TracingReporter, broadcast,
  misc::lock,
  stream::{MaybeTlsStream, StreamReader, StreamWriter},
  web_socket::{Handshake, HandshakeError, decode, frame_len, negotiate},
};
use alloc::sync::Arc;
use core::{net::SocketAddr, time::Duration};
use std::{io::ErrorKind, sync::Mutex};
use tokio::{
  io::{ReadHalf, WriteHalf},
  net::{TcpListener, TcpStream},
  sync::watch,
  time::sleep,
};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);
// EMFILE, ENFILE, ENOBUFS and ENOMEM
#[cfg(any(target_os = "android", target_os = "linux"))]
const EXHAUSTION_CODES: &[i32] = &[24, 23, 105, 12];
#[cfg(all(unix, not(any(target_os = "android", target_os = "linux"))))]
const EXHAUSTION_CODES: &[i32] = &[24, 23, 55, 12];
// WSAEMFILE and WSAENOBUFS
#[cfg(windows)]
const EXHAUSTION_CODES: &[i32] = &[10024, 10055];
#[cfg(not(any(unix, windows)))]
const EXHAUSTION_CODES: &[i32] = &[];

type Reader = ReadHalf<MaybeTlsStream>;
type Writer = WriteHalf<MaybeTlsStream>;

/// Lifecycle of a [`Server`]. `Stopped` is terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServerState {
  /// Bound but not accepting.
  Idle,
  /// Accepting connections.
  Running,
  /// Listener and connections were released.
  Stopped,
}

/// Server errors
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServerError {
  /// `start` was called while the server was running.
  AlreadyStarted,
  /// A stopped server can not be started again.
  AlreadyStopped,
  /// The private key is encrypted but no passphrase was provided.
  MissingPassphrase,
  /// The PEM data does not contain a private key.
  MissingPrivateKey,
  /// The passphrase could not decrypt the private key.
  InvalidPassphrase,
  /// TLS was configured but the `tokio-rustls` feature is not active.
  TlsUnavailable,
  /// Private keys protected by the legacy `Proc-Type` header are not supported.
  UnsupportedKeyEncryption,
}

/// WebSocket relay. Every accepted connection is handled by its own task and every received text
/// message is written to the other registered connections.
#[derive(Debug)]
pub struct Server {
  shared: Arc<Shared>,
}

impl Server {
  /// Binds the listener using [`TracingReporter`].
  #[inline]
  pub async fn bind(config: ServerConfig) -> crate::Result<Self> {
    Self::bind_with_reporter(config, Arc::new(TracingReporter)).await
  }

  /// Binds the listener. Certificates are loaded here so TLS misconfigurations surface before
  /// any connection is accepted.
  #[inline]
  pub async fn bind_with_reporter(
    config: ServerConfig,
    reporter: Arc<dyn Reporter>,
  ) -> crate::Result<Self> {
    #[cfg(feature = "tokio-rustls")]
    let tls_acceptor = match config.tls() {
      Some(elem) => Some(crate::misc::TokioRustlsAcceptor::from_tls_config(elem)?),
      None => None,
    };
    #[cfg(not(feature = "tokio-rustls"))]
    if config.tls().is_some() {
      return Err(ServerError::TlsUnavailable.into());
    }
    let listener = TcpListener::bind((config.host(), config.port())).await?;
    let local_addr = listener.local_addr()?;
    let (shutdown, _) = watch::channel(false);
    Ok(Self {
      shared: Arc::new(Shared {
        config,
        listener: Mutex::new(Some(listener)),
        local_addr,
        registry: Registry::new(),
        reporter,
        shutdown,
        state: Mutex::new(ServerState::Idle),
        #[cfg(feature = "tokio-rustls")]
        tls_acceptor,
      }),
    })
  }

  /// Cloneable handle that can stop the server from other tasks or threads.
  #[inline]
  pub fn handle(&self) -> ServerHandle {
    ServerHandle { shared: Arc::clone(&self.shared) }
  }

  /// Bound address.
  #[inline]
  pub fn local_addr(&self) -> SocketAddr {
    self.shared.local_addr
  }

  /// Accepts connections until [`Self::stop`] is called or the listener fails.
  ///
  /// Whatever the outcome, the server is stopped when this method returns or is cancelled.
  #[inline]
  pub async fn start(&self) -> crate::Result<()> {
    self.shared.begin()?;
    let _guard = StopGuard(&self.shared);
    let Some(listener) = lock(&self.shared.listener).take() else {
      return Ok(());
    };
    let mut shutdown = self.shared.shutdown.subscribe();
    self.shared.reporter.report(&Event::Started { local_addr: self.shared.local_addr });
    loop {
      let rslt = tokio::select! {
        biased;
        _ = shutdown.wait_for(|el| *el) => return Ok(()),
        rslt = listener.accept() => rslt,
      };
      match rslt {
        Ok((stream, peer_addr)) => {
          let shared = Arc::clone(&self.shared);
          let _jh = tokio::spawn(async move { shared.manage_conn(stream, peer_addr).await });
        }
        Err(err) if is_exhaustion(&err) => {
          self.shared.reporter.report(&Event::AcceptFailed { error: &err });
          tokio::select! {
            biased;
            _ = shutdown.wait_for(|el| *el) => return Ok(()),
            () = sleep(ACCEPT_BACKOFF) => {}
          }
        }
        Err(err) if is_transient(&err) => {
          self.shared.reporter.report(&Event::AcceptFailed { error: &err });
        }
        Err(err) => {
          let error = crate::Error::from(err);
          self.shared.reporter.report(&Event::Fatal { error: &error });
          return Err(error);
        }
      }
    }
  }

  /// See [`ServerState`].
  #[inline]
  pub fn state(&self) -> ServerState {
    self.shared.state()
  }

  /// Closes the listener and every connection. Calling it more than once does nothing.
  #[inline]
  pub fn stop(&self) {
    self.shared.stop();
  }
}

/// Shared access to a running [`Server`].
#[derive(Clone, Debug)]
pub struct ServerHandle {
  shared: Arc<Shared>,
}

impl ServerHandle {
  /// Number of registered connections.
  #[inline]
  pub fn connections_len(&self) -> usize {
    self.shared.registry.len()
  }

  /// Bound address.
  #[inline]
  pub fn local_addr(&self) -> SocketAddr {
    self.shared.local_addr
  }

  /// Number of non-empty rooms.
  #[inline]
  pub fn rooms_len(&self) -> usize {
    self.shared.registry.rooms_len()
  }

  /// See [`ServerState`].
  #[inline]
  pub fn state(&self) -> ServerState {
    self.shared.state()
  }

  /// See [`Server::stop`].
  #[inline]
  pub fn stop(&self) {
    self.shared.stop();
  }
}

struct Shared {
  config: ServerConfig,
  listener: Mutex<Option<TcpListener>>,
  local_addr: SocketAddr,
  registry: Registry<Writer>,
  reporter: Arc<dyn Reporter>,
  shutdown: watch::Sender<bool>,
  state: Mutex<ServerState>,
  #[cfg(feature = "tokio-rustls")]
  tls_acceptor: Option<tokio_rustls::TlsAcceptor>,
}

impl Shared {
  fn begin(&self) -> Result<(), ServerError> {
    let mut state = lock(&self.state);
    match *state {
      ServerState::Idle => {
        *state = ServerState::Running;
        Ok(())
      }
      ServerState::Running => Err(ServerError::AlreadyStarted),
      ServerState::Stopped => Err(ServerError::AlreadyStopped),
    }
  }

  async fn handshake(
    &self,
    stream: TcpStream,
    peer_addr: SocketAddr,
  ) -> crate::Result<(Reader, Arc<Peer<Writer>>, Vec<u8>, Option<RoomId>)> {
    let mut stream = self.wrap(stream).await?;
    let (handshake, mut buffer) = read_handshake(
      &mut stream,
      self.config.max_handshake_len(),
      self.config.read_chunk_len(),
    )
    .await?;
    stream.write_all(&handshake.response()).await?;
    let _ = buffer.drain(..handshake.consumed().min(buffer.len()));
    let (reader, writer) = tokio::io::split(stream);
    let meta = ConnMeta::new(
      handshake.host().map(Into::into),
      Some(peer_addr),
      handshake.target().into(),
    );
    let peer = Arc::new(Peer::new(self.registry.next_id(), meta, writer));
    Ok((reader, peer, buffer, handshake.room().map(RoomId::from)))
  }

  async fn manage_conn(self: Arc<Self>, stream: TcpStream, peer_addr: SocketAddr) {
    let mut shutdown = self.shutdown.subscribe();
    let rslt = tokio::select! {
      biased;
      _ = shutdown.wait_for(|el| *el) => return,
      rslt = self.handshake(stream, peer_addr) => rslt,
    };
    let (reader, peer, buffer, room) = match rslt {
      Ok(elem) => elem,
      Err(error) => {
        self.reporter.report(&Event::HandshakeFailed { peer_addr: Some(peer_addr), error: &error });
        return;
      }
    };
    let conn_id = peer.id();
    if let Err(err) = self.registry.add(Arc::clone(&peer)) {
      let error = crate::Error::from(err);
      self.reporter.report(&Event::HandshakeFailed { peer_addr: Some(peer_addr), error: &error });
      return;
    }
    if let Some(elem) = &room {
      let _rslt = self.registry.join_room(conn_id, elem.clone());
    }
    let is_stopping = *shutdown.borrow();
    let reason = if is_stopping {
      DisconnectReason::Shutdown
    } else {
      let meta = peer.meta();
      self.reporter.report(&Event::Connected {
        conn_id,
        peer_addr: meta.peer_addr(),
        target: meta.target(),
        host: meta.host(),
        room: room.as_ref(),
      });
      self.read_frames(&peer, reader, buffer, &mut shutdown).await
    };
    let _peer = self.registry.remove(conn_id);
    let _rslt = peer.try_shutdown().await;
    self.reporter.report(&Event::Disconnected { conn_id, reason });
  }

  async fn read_frames(
    &self,
    peer: &Peer<Writer>,
    mut reader: Reader,
    mut buffer: Vec<u8>,
    shutdown: &mut watch::Receiver<bool>,
  ) -> DisconnectReason {
    let conn_id = peer.id();
    let chunk_len = self.config.read_chunk_len();
    let max_payload_len = self.config.max_payload_len();
    loop {
      loop {
        let len = match frame_len(&buffer, max_payload_len) {
          Ok(Some(elem)) if elem <= buffer.len() => elem,
          Ok(_) => break,
          Err(error) => {
            self.reporter.report(&Event::DecodeFailed { conn_id, error });
            return DisconnectReason::DecodeFailure;
          }
        };
        let rslt = decode(buffer.get(..len).unwrap_or_default());
        let _ = buffer.drain(..len);
        let frame = match rslt {
          Ok(elem) => elem,
          Err(error) if !error.is_fatal() => {
            self.reporter.report(&Event::FrameIgnored { conn_id, error });
            continue;
          }
          Err(error) => {
            self.reporter.report(&Event::DecodeFailed { conn_id, error });
            return DisconnectReason::DecodeFailure;
          }
        };
        let payload = match frame.text_payload() {
          Ok(elem) => elem,
          Err(error) => {
            self.reporter.report(&Event::InvalidUtf8 { conn_id, error });
            return DisconnectReason::InvalidUtf8;
          }
        };
        tokio::select! {
          biased;
          _ = shutdown.wait_for(|el| *el) => return DisconnectReason::Shutdown,
          () = self.relay(conn_id, payload) => {}
        }
      }
      let prev_len = buffer.len();
      buffer.resize(prev_len.wrapping_add(chunk_len), 0);
      let rslt = tokio::select! {
        biased;
        _ = shutdown.wait_for(|el| *el) => return DisconnectReason::Shutdown,
        () = peer.closed() => {
          return if peer.has_failed_write() {
            DisconnectReason::WriteFailure
          } else {
            DisconnectReason::Removed
          };
        }
        rslt = reader.read(buffer.get_mut(prev_len..).unwrap_or_default()) => rslt,
      };
      match rslt {
        Ok(0) => return DisconnectReason::EndOfStream,
        Ok(read) => buffer.truncate(prev_len.wrapping_add(read)),
        Err(_) => return DisconnectReason::ReadFailure,
      }
    }
  }

  async fn relay(&self, sender: ConnId, payload: &str) {
    let scope = match self.registry.room_of(sender) {
      Some(room) if self.config.room_scoped_broadcast() => BroadcastScope::Room(room),
      _ => BroadcastScope::All,
    };
    let recipients = broadcast(
      &self.registry,
      &*self.reporter,
      sender,
      payload,
      &scope,
      self.config.echo_to_sender(),
    )
    .await;
    self.reporter.report(&Event::Received { conn_id: sender, payload, recipients });
  }

  fn state(&self) -> ServerState {
    *lock(&self.state)
  }

  fn stop(&self) {
    {
      let mut state = lock(&self.state);
      if *state == ServerState::Stopped {
        return;
      }
      *state = ServerState::Stopped;
    }
    let _prev = self.shutdown.send_replace(true);
    drop(lock(&self.listener).take());
    drop(self.registry.clear());
    self.reporter.report(&Event::Stopped);
  }

  async fn wrap(&self, stream: TcpStream) -> crate::Result<MaybeTlsStream> {
    #[cfg(feature = "tokio-rustls")]
    if let Some(acceptor) = &self.tls_acceptor {
      return Ok(MaybeTlsStream::Tls(Box::new(acceptor.accept(stream).await?)));
    }
    Ok(MaybeTlsStream::Plain(stream))
  }
}

impl core::fmt::Debug for Shared {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("Shared")
      .field("config", &self.config)
      .field("local_addr", &self.local_addr)
      .field("state", &self.state())
      .finish_non_exhaustive()
  }
}

struct StopGuard<'shared>(&'shared Shared);

impl Drop for StopGuard<'_> {
  #[inline]
  fn drop(&mut self) {
    self.0.stop();
  }
}

// Descriptors or buffers ran out. Accepting resumes after `ACCEPT_BACKOFF`.
fn is_exhaustion(err: &std::io::Error) -> bool {
  if err.kind() == ErrorKind::OutOfMemory {
    return true;
  }
  err.raw_os_error().is_some_and(|code| EXHAUSTION_CODES.contains(&code))
}

fn is_transient(err: &std::io::Error) -> bool {
  matches!(
    err.kind(),
    ErrorKind::ConnectionAborted
      | ErrorKind::ConnectionRefused
      | ErrorKind::ConnectionReset
      | ErrorKind::Interrupted
      | ErrorKind::TimedOut
      | ErrorKind::WouldBlock
  )
}

async fn read_handshake<S>(
  stream: &mut S,
  max_len: usize,
  chunk_len: usize,
) -> crate::Result<(Handshake, Vec<u8>)>
where
  S: StreamReader,
{
  let mut buffer = Vec::new();
  loop {
    let prev_len = buffer.len();
    buffer.resize(prev_len.wrapping_add(chunk_len), 0);
    let read = stream.read(buffer.get_mut(prev_len..).unwrap_or_default()).await?;
    buffer.truncate(prev_len.wrapping_add(read));
    if read == 0 {
      return Err(HandshakeError::IncompleteRequest.into());
    }
    match negotiate(&buffer) {
      Ok(elem) if elem.consumed() > max_len => break,
      Ok(elem) => return Ok((elem, buffer)),
      Err(HandshakeError::IncompleteRequest) if buffer.len() < max_len => {}
      Err(HandshakeError::IncompleteRequest) => break,
      Err(err) => return Err(err.into()),
    }
  }
  Err(HandshakeError::RequestTooLarge { max: max_len }.into())
}
