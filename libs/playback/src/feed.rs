use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::PlaybackError;

/// Максимальный размер UDP datagram.
const MAX_DATAGRAM: usize = 65_536;

/// Живой поток событий: каждый UTF-8 datagram — одно событие.
pub struct UdpFeed {
    pub events: mpsc::Receiver<String>,
    pub local_addr: SocketAddr,
    pub handle: JoinHandle<()>,
}

/// Слушать `bind` и пересылать каждый datagram в канал событий.
///
/// Не-UTF-8 datagram'ы логируются и пропускаются. Задача завершается по
/// token или когда получатель событий закрыт.
pub async fn spawn_udp_feed(
    bind: &str,
    buffer: usize,
    token: CancellationToken,
) -> Result<UdpFeed, PlaybackError> {
    let feed_err = |source| PlaybackError::Feed { addr: bind.to_string(), source };

    let socket = UdpSocket::bind(bind).await.map_err(feed_err)?;
    let local_addr = socket.local_addr().map_err(feed_err)?;
    tracing::info!(addr = %local_addr, "udp feed listening");

    let (tx, events) = mpsc::channel(buffer);
    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                received = socket.recv_from(&mut buf) => match received {
                    Ok((n, peer)) => match std::str::from_utf8(&buf[..n]) {
                        Ok(text) => {
                            if tx.send(text.to_string()).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(%peer, len = n, error = %e, "non-utf8 datagram, skipping");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(addr = %local_addr, error = %e, "udp feed receive error");
                    }
                },
            }
        }
        tracing::info!(addr = %local_addr, "udp feed stopped");
    });

    Ok(UdpFeed { events, local_addr, handle })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_utf8_datagrams_and_skips_garbage() {
        let token = CancellationToken::new();
        let mut feed = spawn_udp_feed("127.0.0.1:0", 16, token.clone()).await.unwrap();

        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tx.send_to(b"first", feed.local_addr).await.unwrap();
        tx.send_to(&[0xff, 0xfe, 0x00], feed.local_addr).await.unwrap();
        tx.send_to("second ✓".as_bytes(), feed.local_addr).await.unwrap();

        assert_eq!(feed.events.recv().await.unwrap(), "first");
        assert_eq!(feed.events.recv().await.unwrap(), "second ✓");

        token.cancel();
        feed.handle.await.unwrap();
        assert!(feed.events.recv().await.is_none());
    }

    #[tokio::test]
    async fn bind_failure_names_address() {
        let taken = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = spawn_udp_feed(&addr, 1, CancellationToken::new()).await.err().unwrap();
        assert!(matches!(err, PlaybackError::Feed { .. }));
        assert!(err.to_string().contains(&addr), "{err}");
    }
}
