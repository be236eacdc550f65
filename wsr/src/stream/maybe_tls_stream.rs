use core::{
  pin::Pin,
  task::{Context, Poll},
};
use tokio::{
  io::{AsyncRead, AsyncWrite, ReadBuf},
  net::TcpStream,
};

/// Accepted transport, encrypted or not.
#[derive(Debug)]
pub enum MaybeTlsStream {
  /// Raw TCP.
  Plain(TcpStream),
  /// TCP wrapped by a server-side TLS session.
  #[cfg(feature = "tokio-rustls")]
  Tls(Box<tokio_rustls::server::TlsStream<TcpStream>>),
}

impl AsyncRead for MaybeTlsStream {
  #[inline]
  fn poll_read(
    self: Pin<&mut Self>,
    cx: &mut Context<'_>,
    buf: &mut ReadBuf<'_>,
  ) -> Poll<std::io::Result<()>> {
    match self.get_mut() {
      Self::Plain(elem) => Pin::new(elem).poll_read(cx, buf),
      #[cfg(feature = "tokio-rustls")]
      Self::Tls(elem) => Pin::new(&mut **elem).poll_read(cx, buf),
    }
  }
}

impl AsyncWrite for MaybeTlsStream {
  #[inline]
  fn poll_write(
    self: Pin<&mut Self>,
    cx: &mut Context<'_>,
    buf: &[u8],
  ) -> Poll<std::io::Result<usize>> {
    match self.get_mut() {
      Self::Plain(elem) => Pin::new(elem).poll_write(cx, buf),
      #[cfg(feature = "tokio-rustls")]
      Self::Tls(elem) => Pin::new(&mut **elem).poll_write(cx, buf),
    }
  }

  #[inline]
  fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
    match self.get_mut() {
      Self::Plain(elem) => Pin::new(elem).poll_flush(cx),
      #[cfg(feature = "tokio-rustls")]
      Self::Tls(elem) => Pin::new(&mut **elem).poll_flush(cx),
    }
  }

  #[inline]
  fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
    match self.get_mut() {
      Self::Plain(elem) => Pin::new(elem).poll_shutdown(cx),
      #[cfg(feature = "tokio-rustls")]
      Self::Tls(elem) => Pin::new(&mut **elem).poll_shutdown(cx),
    }
  }
}
