use crate::stream::{MaybeTlsStream, StreamReader, StreamWriter};
use tokio::{
  io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf},
  net::TcpStream,
};

macro_rules! _impl_streams {
  ($($ty:ty),* $(,)?) => {
    $(
      impl StreamReader for $ty {
        #[inline]
        async fn read(&mut self, bytes: &mut [u8]) -> crate::Result<usize> {
          Ok(<Self as AsyncReadExt>::read(self, bytes).await?)
        }
      }

      impl StreamWriter for $ty {
        #[inline]
        async fn write_all(&mut self, bytes: &[u8]) -> crate::Result<()> {
          <Self as AsyncWriteExt>::write_all(self, bytes).await?;
          <Self as AsyncWriteExt>::flush(self).await?;
          Ok(())
        }

        #[inline]
        async fn shutdown(&mut self) -> crate::Result<()> {
          <Self as AsyncWriteExt>::shutdown(self).await?;
          Ok(())
        }
      }
    )*
  };
}

_impl_streams!(DuplexStream, MaybeTlsStream, TcpStream);

impl<T> StreamReader for ReadHalf<T>
where
  T: AsyncRead + Send,
{
  #[inline]
  async fn read(&mut self, bytes: &mut [u8]) -> crate::Result<usize> {
    Ok(<Self as AsyncReadExt>::read(self, bytes).await?)
  }
}

impl<T> StreamWriter for WriteHalf<T>
where
  T: AsyncWrite + Send,
{
  #[inline]
  async fn write_all(&mut self, bytes: &[u8]) -> crate::Result<()> {
    <Self as AsyncWriteExt>::write_all(self, bytes).await?;
    <Self as AsyncWriteExt>::flush(self).await?;
    Ok(())
  }

  #[inline]
  async fn shutdown(&mut self) -> crate::Result<()> {
    <Self as AsyncWriteExt>::shutdown(self).await?;
    Ok(())
  }
}
