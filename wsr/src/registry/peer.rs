use crate::{ConnId, misc::ConnectionState, stream::StreamWriter};
use core::{
  net::SocketAddr,
  sync::atomic::{AtomicBool, AtomicU8, Ordering},
};
use tokio::sync::{Mutex, Notify};

/// Metadata negotiated during the opening handshake.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConnMeta {
  host: Option<String>,
  peer_addr: Option<SocketAddr>,
  target: String,
}

impl ConnMeta {
  /// New instance
  #[inline]
  pub fn new(host: Option<String>, peer_addr: Option<SocketAddr>, target: String) -> Self {
    Self { host, peer_addr, target }
  }

  /// `Host` header.
  #[inline]
  pub fn host(&self) -> Option<&str> {
    self.host.as_deref()
  }

  /// Remote address.
  #[inline]
  pub fn peer_addr(&self) -> Option<SocketAddr> {
    self.peer_addr
  }

  /// Request target.
  #[inline]
  pub fn target(&self) -> &str {
    &self.target
  }
}

/// A connection as seen by the registry: identity, metadata and the write half of the
/// transport.
#[derive(Debug)]
pub struct Peer<W> {
  closed: Notify,
  id: ConnId,
  meta: ConnMeta,
  state: AtomicU8,
  write_failed: AtomicBool,
  writer: Mutex<W>,
}

impl<W> Peer<W> {
  /// New instance in the `Connecting` state.
  #[inline]
  pub fn new(id: ConnId, meta: ConnMeta, writer: W) -> Self {
    Self {
      closed: Notify::new(),
      id,
      meta,
      state: AtomicU8::new(ConnectionState::Connecting.into()),
      write_failed: AtomicBool::new(false),
      writer: Mutex::new(writer),
    }
  }

  /// Resolves once the connection left the registry.
  #[inline]
  pub async fn closed(&self) {
    if self.state().is_closed() {
      return;
    }
    self.closed.notified().await;
  }

  /// Whether a previous [`Self::write_all`] failed.
  #[inline]
  pub fn has_failed_write(&self) -> bool {
    self.write_failed.load(Ordering::Acquire)
  }

  /// Identity
  #[inline]
  pub fn id(&self) -> ConnId {
    self.id
  }

  /// See [`ConnMeta`].
  #[inline]
  pub fn meta(&self) -> &ConnMeta {
    &self.meta
  }

  /// See [`ConnectionState`].
  #[inline]
  pub fn state(&self) -> ConnectionState {
    self.state.load(Ordering::Acquire).into()
  }

  pub(crate) fn mark_open(&self) {
    let _rslt = self.state.compare_exchange(
      ConnectionState::Connecting.into(),
      ConnectionState::Open.into(),
      Ordering::AcqRel,
      Ordering::Acquire,
    );
  }

  pub(crate) fn mark_closed(&self) {
    let prev = self.state.swap(ConnectionState::Closed.into(), Ordering::AcqRel);
    if !ConnectionState::from(prev).is_closed() {
      self.closed.notify_one();
    }
  }
}

impl<W> Peer<W>
where
  W: StreamWriter,
{
  /// Flushes and closes the write side of the transport.
  #[inline]
  pub async fn shutdown(&self) -> crate::Result<()> {
    self.writer.lock().await.shutdown().await
  }

  /// Like [`Self::shutdown`] but does nothing if a write is in progress. The transport is
  /// then closed once the last reference is dropped.
  #[inline]
  pub async fn try_shutdown(&self) -> crate::Result<()> {
    let Ok(mut writer) = self.writer.try_lock() else {
      return Ok(());
    };
    writer.shutdown().await
  }

  /// Writes all `bytes` to the transport. Concurrent writers are serialized.
  #[inline]
  pub async fn write_all(&self, bytes: &[u8]) -> crate::Result<()> {
    let rslt = self.writer.lock().await.write_all(bytes).await;
    if rslt.is_err() {
      self.write_failed.store(true, Ordering::Release);
    }
    rslt
  }
}
