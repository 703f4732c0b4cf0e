use bordas_common::config::ServerConfig;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Heartbeat sent to every WebSocket client, independent of the HTTP API.
#[derive(Debug, Clone)]
pub struct KeepAliveSettings {
    pub interval: Duration,
    pub message: String,
}

impl From<&ServerConfig> for KeepAliveSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.keepalive_interval_secs),
            message: config.keepalive_message.clone(),
        }
    }
}

/// Run the listener on a dedicated OS thread with its own single-threaded
/// runtime. The thread shares nothing with the HTTP server and lives until
/// the process exits.
pub fn spawn(addr: String, settings: KeepAliveSettings) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("keepalive".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "failed to build keep-alive runtime");
                    return;
                }
            };
            runtime.block_on(async move {
                let listener = match TcpListener::bind(&addr).await {
                    Ok(l) => l,
                    Err(e) => {
                        error!(addr, error = %e, "failed to bind keep-alive listener");
                        return;
                    }
                };
                info!(addr, "keep-alive WebSocket server listening");
                serve(listener, Arc::new(settings)).await;
            });
        })
}

pub async fn serve(listener: TcpListener, settings: Arc<KeepAliveSettings>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(handle_connection(stream, peer, Arc::clone(&settings)));
            }
            Err(e) => {
                warn!(error = %e, "keep-alive accept failed");
            }
        }
    }
}

/// Send the heartbeat, wait one interval, repeat. Returns once the peer
/// closes, the stream ends, or a send or read fails.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    settings: Arc<KeepAliveSettings>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    info!(%peer, "keep-alive client connected");

    let (mut sink, mut source) = ws.split();
    'connection: loop {
        if let Err(e) = sink.send(Message::Text(settings.message.clone())).await {
            debug!(%peer, error = %e, "keep-alive send failed");
            break;
        }

        let deadline = tokio::time::Instant::now() + settings.interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                incoming = source.next() => match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break 'connection,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
    info!(%peer, "keep-alive client disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(interval: Duration) -> Arc<KeepAliveSettings> {
        Arc::new(KeepAliveSettings {
            interval,
            message: "ok".into(),
        })
    }

    #[tokio::test]
    async fn client_receives_repeated_heartbeats() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, settings(Duration::from_millis(20))));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        for _ in 0..2 {
            let msg = ws.next().await.unwrap().unwrap();
            assert_eq!(msg, Message::Text("ok".into()));
        }
    }

    #[tokio::test]
    async fn connection_ends_when_client_closes_during_wait() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, peer) = listener.accept().await.unwrap();
            handle_connection(stream, peer, settings(Duration::from_secs(3600))).await;
        });

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        assert_eq!(ws.next().await.unwrap().unwrap(), Message::Text("ok".into()));
        ws.close(None).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("handler should return after the client closes")
            .unwrap();
    }

    #[test]
    fn settings_follow_server_config() {
        let s = KeepAliveSettings::from(&ServerConfig::default());
        assert_eq!(s.interval, Duration::from_secs(5000));
        assert_eq!(s.message, "ok");
    }
}
