use clap::Parser;

pub(crate) async fn init() -> wsr::Result<()> {
  let args = Cli::parse();
  match args.commands {
    Commands::_Nothing => {}
    #[cfg(feature = "serve")]
    Commands::Serve(elem) => {
      crate::serve::serve(elem.into_config()?).await?;
    }
  }
  Ok(())
}

/// WebSocket relay
#[derive(Debug, clap::Parser)]
#[command(author, long_about = None, name = "wsr", version)]
struct Cli {
  #[command(subcommand)]
  commands: Commands,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
  #[clap(skip)]
  _Nothing,
  #[cfg(feature = "serve")]
  Serve(Serve),
}

/// Relays text messages between connected clients
#[cfg(feature = "serve")]
#[derive(Debug, clap::Args)]
struct Serve {
  /// PEM certificate chain. Enables TLS
  #[arg(long, value_name = "PATH")]
  cert: Option<std::path::PathBuf>,
  /// Reads `WSR_*` variables from the process or from the nearest `.env` file. Flags take
  /// precedence
  #[arg(long)]
  env: bool,
  /// Relays every message to every client regardless of rooms
  #[arg(long)]
  global: bool,
  /// Listening address
  #[arg(long, value_name = "IP")]
  host: Option<core::net::IpAddr>,
  /// PEM private key. Defaults to the certificate file
  #[arg(long, value_name = "PATH")]
  key: Option<std::path::PathBuf>,
  /// Does not send messages back to their sender
  #[arg(long)]
  no_echo: bool,
  /// Passphrase of the private key
  #[arg(long)]
  passphrase: Option<String>,
  /// Listening port [default: 8090]
  #[arg(long, short = 'p')]
  port: Option<u16>,
}

#[cfg(feature = "serve")]
impl Serve {
  fn into_config(self) -> wsr::Result<wsr::ServerConfig> {
    use wsr::{ServerConfig, TlsConfig, misc::EnvVars};
    let mut config = if self.env {
      EnvVars::<ServerConfig>::from_available()?.finish()
    } else {
      ServerConfig::default()
    };
    if let Some(elem) = self.host {
      config = config.with_host(elem);
    }
    if let Some(elem) = self.port {
      config = config.with_port(elem);
    }
    if self.global {
      config = config.with_room_scoped_broadcast(false);
    }
    if self.no_echo {
      config = config.with_echo_to_sender(false);
    }
    if let Some(elem) = self.cert {
      let tls = TlsConfig::new(elem).with_key_path(self.key).with_passphrase(self.passphrase);
      config = config.with_tls(Some(tls));
    }
    Ok(config)
  }
}
