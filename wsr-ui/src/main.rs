//! Command line interface of the `wsr` relay.

#[cfg(feature = "clap")]
mod clap;
#[cfg(feature = "serve")]
mod serve;

#[tokio::main]
async fn main() -> wsr::Result<()> {
  #[cfg(feature = "clap")]
  clap::init().await?;
  Ok(())
}
