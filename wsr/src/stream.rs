//! Transport abstractions used by connections.

mod maybe_tls_stream;
mod tokio;

pub use maybe_tls_stream::MaybeTlsStream;

use core::future::Future;

/// A stream of values produced asynchronously.
pub trait StreamReader {
  /// Pulls some bytes from this source into the specified buffer, returning how many bytes
  /// were read. Zero means end of stream.
  fn read(&mut self, bytes: &mut [u8]) -> impl Future<Output = crate::Result<usize>> + Send;
}

/// A stream of values written asynchronously.
pub trait StreamWriter {
  /// Attempts to write and flush ***all*** `bytes`.
  fn write_all(&mut self, bytes: &[u8]) -> impl Future<Output = crate::Result<()>> + Send;

  /// Flushes pending data and closes the write side.
  fn shutdown(&mut self) -> impl Future<Output = crate::Result<()>> + Send;
}

impl StreamReader for () {
  #[inline]
  async fn read(&mut self, _: &mut [u8]) -> crate::Result<usize> {
    Ok(0)
  }
}

impl StreamWriter for () {
  #[inline]
  async fn write_all(&mut self, _: &[u8]) -> crate::Result<()> {
    Ok(())
  }

  #[inline]
  async fn shutdown(&mut self) -> crate::Result<()> {
    Ok(())
  }
}
