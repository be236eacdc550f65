use crate::{ConnId, RoomId, web_socket::FrameDecodeError};
use core::{net::SocketAddr, str::Utf8Error};

/// Why a connection left the registry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DisconnectReason {
  /// A frame could not be decoded.
  DecodeFailure,
  /// The peer closed its side of the transport.
  EndOfStream,
  /// A text frame carried invalid UTF-8.
  InvalidUtf8,
  /// Reading from the transport failed.
  ReadFailure,
  /// Another party removed the connection from the registry.
  Removed,
  /// The server is stopping.
  Shutdown,
  /// Writing a frame to this connection failed.
  WriteFailure,
}

/// Everything the server reports while running.
#[derive(Debug)]
pub enum Event<'any> {
  /// The listener is accepting connections.
  Started {
    /// Bound address.
    local_addr: SocketAddr,
  },
  /// The listener and every connection were released.
  Stopped,
  /// A handshake succeeded and the connection was registered.
  Connected {
    /// Identity of the new connection.
    conn_id: ConnId,
    /// Remote address.
    peer_addr: Option<SocketAddr>,
    /// Request target of the upgrade request.
    target: &'any str,
    /// `Host` header of the upgrade request.
    host: Option<&'any str>,
    /// Joined room.
    room: Option<&'any RoomId>,
  },
  /// The TLS session or the opening handshake could not be established.
  HandshakeFailed {
    /// Remote address.
    peer_addr: Option<SocketAddr>,
    /// Cause.
    error: &'any crate::Error,
  },
  /// A registered connection was released.
  Disconnected {
    /// Identity of the released connection.
    conn_id: ConnId,
    /// Cause.
    reason: DisconnectReason,
  },
  /// A frame was dropped but the connection stays open.
  FrameIgnored {
    /// Sender.
    conn_id: ConnId,
    /// Cause.
    error: FrameDecodeError,
  },
  /// A frame could not be decoded. The connection is dropped.
  DecodeFailed {
    /// Sender.
    conn_id: ConnId,
    /// Cause.
    error: FrameDecodeError,
  },
  /// A text frame carried invalid UTF-8. The connection is dropped.
  InvalidUtf8 {
    /// Sender.
    conn_id: ConnId,
    /// Cause.
    error: Utf8Error,
  },
  /// A message was relayed.
  Received {
    /// Sender.
    conn_id: ConnId,
    /// Decoded text.
    payload: &'any str,
    /// Number of connections that received the frame.
    recipients: usize,
  },
  /// A frame could not be written. The recipient is dropped.
  WriteFailed {
    /// Recipient.
    conn_id: ConnId,
    /// Cause.
    error: &'any crate::Error,
  },
  /// A non-fatal failure while accepting a connection.
  AcceptFailed {
    /// Cause.
    error: &'any std::io::Error,
  },
  /// The server can not keep running.
  Fatal {
    /// Cause.
    error: &'any crate::Error,
  },
}

/// Observability sink of the server.
pub trait Reporter: Send + Sync {
  /// Called synchronously for every event. Implementations should not block.
  fn report(&self, event: &Event<'_>);
}

impl Reporter for () {
  #[inline]
  fn report(&self, _: &Event<'_>) {}
}

/// Forwards events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
  #[inline]
  fn report(&self, event: &Event<'_>) {
    match event {
      Event::Started { local_addr } => tracing::info!(%local_addr, "server started"),
      Event::Stopped => tracing::info!("server stopped"),
      Event::Connected { conn_id, peer_addr, target, host, room } => {
        let request_target = *target;
        tracing::info!(?conn_id, ?peer_addr, request_target, ?host, ?room, "client connected");
      }
      Event::HandshakeFailed { peer_addr, error } => {
        tracing::warn!(?peer_addr, %error, "handshake failed");
      }
      Event::Disconnected { conn_id, reason } => {
        tracing::info!(?conn_id, ?reason, "client disconnected");
      }
      Event::FrameIgnored { conn_id, error } => tracing::debug!(?conn_id, ?error, "frame ignored"),
      Event::DecodeFailed { conn_id, error } => {
        tracing::warn!(?conn_id, ?error, "frame could not be decoded");
      }
      Event::InvalidUtf8 { conn_id, error } => tracing::warn!(?conn_id, %error, "invalid UTF-8"),
      Event::Received { conn_id, payload, recipients } => {
        tracing::debug!(?conn_id, payload, recipients, "message relayed");
      }
      Event::WriteFailed { conn_id, error } => tracing::warn!(?conn_id, %error, "write failed"),
      Event::AcceptFailed { error } => tracing::warn!(%error, "accept failed"),
      Event::Fatal { error } => tracing::error!(%error, "fatal server failure"),
    }
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use crate::{ConnId, DisconnectReason, Event, Reporter};
  use std::sync::Mutex;

  /// Stores a textual rendition of every event.
  #[derive(Debug, Default)]
  pub(crate) struct RecordingReporter {
    pub(crate) events: Mutex<Vec<String>>,
  }

  impl RecordingReporter {
    pub(crate) fn contains(&self, prefix: &str) -> bool {
      self.events.lock().unwrap().iter().any(|el| el.starts_with(prefix))
    }
  }

  impl Reporter for RecordingReporter {
    fn report(&self, event: &Event<'_>) {
      self.events.lock().unwrap().push(format!("{event:?}"));
    }
  }

  #[test]
  fn recording_reporter_keeps_order() {
    let reporter = RecordingReporter::default();
    reporter.report(&Event::Stopped);
    reporter.report(&Event::Disconnected {
      conn_id: ConnId::from(1),
      reason: DisconnectReason::EndOfStream,
    });
    let events = reporter.events.lock().unwrap();
    assert_eq!(events[0], "Stopped");
    assert!(events[1].starts_with("Disconnected"));
  }
}
