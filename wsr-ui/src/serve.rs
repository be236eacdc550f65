use wsr::{Server, ServerConfig};

pub(crate) async fn serve(config: ServerConfig) -> wsr::Result<()> {
  wsr::misc::tracing_tree_init(Some("info"))?;
  let server = Server::bind(config).await?;
  let handle = server.handle();
  let _jh = tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      handle.stop();
    }
  });
  server.start().await
}
