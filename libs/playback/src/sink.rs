use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use tokio::net::UdpSocket;

use crate::PlaybackError;

pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), std::io::Error>> + Send + 'a>>;

/// Получатель воспроизводимых payload'ов: одна отправка на запись,
/// без подтверждений и повторов.
pub trait DatagramSink: Send {
    fn send<'a>(&'a mut self, payload: &'a [u8]) -> SinkFuture<'a>;

    /// Освободить ресурс. Повторный вызов безопасен.
    fn close(&mut self) {}
}

// ═══════════════════════════════════════════════════════════════
//  UdpSink
// ═══════════════════════════════════════════════════════════════

pub struct UdpSink {
    socket: Option<UdpSocket>,
    target: SocketAddr,
}

impl UdpSink {
    /// Разрешить `host:port` и открыть локальный сокет на эфемерном порту.
    pub async fn connect(host: &str, port: u16) -> Result<Self, PlaybackError> {
        let sink_err = |source| PlaybackError::Sink { target: format!("{host}:{port}"), source };

        let target = tokio::net::lookup_host((host, port))
            .await
            .map_err(sink_err)?
            .next()
            .ok_or_else(|| sink_err(std::io::Error::other("host resolved to no addresses")))?;

        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(bind).await.map_err(sink_err)?;
        tracing::info!(%target, "udp sink ready");

        Ok(Self { socket: Some(socket), target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl DatagramSink for UdpSink {
    fn send<'a>(&'a mut self, payload: &'a [u8]) -> SinkFuture<'a> {
        Box::pin(async move {
            let socket = self
                .socket
                .as_ref()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotConnected, "udp sink closed"))?;
            let sent = socket.send_to(payload, self.target).await?;
            if sent < payload.len() {
                tracing::warn!(target = %self.target, sent, len = payload.len(), "datagram truncated");
            }
            Ok(())
        })
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!(target = %self.target, "udp sink closed");
        }
    }
}
