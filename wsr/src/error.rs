use crate::{
  RegistryError, ServerError,
  web_socket::{FrameDecodeError, HandshakeError},
};
use core::fmt::{Debug, Display, Formatter};

/// Grouped individual errors
#[derive(Debug)]
pub enum Error {
  // External - Misc
  //
  #[cfg(feature = "tokio-rustls")]
  Pkcs8Error(pkcs8::Error),
  #[cfg(feature = "tokio-rustls")]
  TokioRustlsError(Box<tokio_rustls::rustls::Error>),
  #[cfg(feature = "_tracing-tree")]
  TryInitError(tracing_subscriber::util::TryInitError),

  // External - Std
  //
  AddrParseError(core::net::AddrParseError),
  IoError(std::io::Error),
  ParseBoolError(core::str::ParseBoolError),
  ParseIntError(core::num::ParseIntError),

  // Generic
  //
  /// A required environment variable is absent.
  MissingVar(String),

  // Internal
  //
  FrameDecodeError(FrameDecodeError),
  HandshakeError(HandshakeError),
  RegistryError(RegistryError),
  ServerError(ServerError),
}

impl Display for Error {
  #[inline]
  fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
    <Self as Debug>::fmt(self, f)
  }
}

impl core::error::Error for Error {}

#[cfg(feature = "tokio-rustls")]
impl From<pkcs8::Error> for Error {
  #[inline]
  fn from(from: pkcs8::Error) -> Self {
    Self::Pkcs8Error(from)
  }
}

#[cfg(feature = "tokio-rustls")]
impl From<pkcs8::der::Error> for Error {
  #[inline]
  fn from(from: pkcs8::der::Error) -> Self {
    Self::Pkcs8Error(from.into())
  }
}

#[cfg(feature = "tokio-rustls")]
impl From<tokio_rustls::rustls::Error> for Error {
  #[inline]
  #[track_caller]
  fn from(from: tokio_rustls::rustls::Error) -> Self {
    Self::TokioRustlsError(from.into())
  }
}

#[cfg(feature = "_tracing-tree")]
impl From<tracing_subscriber::util::TryInitError> for Error {
  #[inline]
  fn from(from: tracing_subscriber::util::TryInitError) -> Self {
    Self::TryInitError(from)
  }
}

impl From<core::net::AddrParseError> for Error {
  #[inline]
  #[track_caller]
  fn from(from: core::net::AddrParseError) -> Self {
    Self::AddrParseError(from)
  }
}

impl From<std::io::Error> for Error {
  #[inline]
  #[track_caller]
  fn from(from: std::io::Error) -> Self {
    Self::IoError(from)
  }
}

impl From<core::str::ParseBoolError> for Error {
  #[inline]
  #[track_caller]
  fn from(from: core::str::ParseBoolError) -> Self {
    Self::ParseBoolError(from)
  }
}

impl From<core::num::ParseIntError> for Error {
  #[inline]
  #[track_caller]
  fn from(from: core::num::ParseIntError) -> Self {
    Self::ParseIntError(from)
  }
}

impl From<FrameDecodeError> for Error {
  #[inline]
  fn from(from: FrameDecodeError) -> Self {
    Self::FrameDecodeError(from)
  }
}

impl From<HandshakeError> for Error {
  #[inline]
  fn from(from: HandshakeError) -> Self {
    Self::HandshakeError(from)
  }
}

impl From<RegistryError> for Error {
  #[inline]
  fn from(from: RegistryError) -> Self {
    Self::RegistryError(from)
  }
}

impl From<ServerError> for Error {
  #[inline]
  fn from(from: ServerError) -> Self {
    Self::ServerError(from)
  }
}
