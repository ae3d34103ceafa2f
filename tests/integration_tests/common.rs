use anyhow::Result;
use resp_server_rs::{
    cfg::config::Config,
    resp::client::Client,
    tcp::{self, handler::RespHandler},
};
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// An in-process server bound to an ephemeral port, shut down through the
/// same cancellation path the signal handler uses.
pub struct TestServer {
    pub addr: String,
    shutdown: CancellationToken,
    serving: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(cfg: &Config) -> Result<Self> {
        let handler = RespHandler::bootstrap(cfg).await?;
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let shutdown = CancellationToken::new();
        let serving = tokio::spawn(tcp::listen_and_serve(
            listener,
            handler,
            shutdown.clone(),
        ));
        Ok(Self { addr, shutdown, serving })
    }

    /// Graceful stop: close the listener, drain connections, flush
    /// persistence, join the accept task.
    pub async fn stop(self) {
        self.shutdown.cancel();
        let _ = self.serving.await;
    }

    pub async fn client(&self) -> Result<Client> {
        Client::connect(&self.addr).await
    }
}

pub fn cmd(parts: &[&str]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.as_bytes().to_vec()).collect()
}
