//! Conexão WebSocket com o stream de profundidade
//!
//! O loop de ingestão e a tarefa de reconexão só enxergam os traits
//! [`Dialer`] e [`FeedConnection`]; a implementação real usa
//! `tokio-tungstenite`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::FeedError;

/// Tempo máximo para o handshake de fechamento.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Uma conexão viva com o feed.
#[async_trait]
pub trait FeedConnection: Send + 'static {
    /// Lê uma mensagem de dados, esperando no máximo `deadline`.
    ///
    /// Estourar o prazo é um erro como outro qualquer: quem chama não
    /// distingue timeout de desconexão.
    async fn read_frame(&mut self, deadline: Duration) -> Result<String, FeedError>;

    /// Encerra a conexão. Erros são ignorados.
    async fn close(&mut self);
}

/// Abre conexões novas com o endpoint.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Conn: FeedConnection;

    async fn dial(&self) -> Result<Self::Conn, FeedError>;

    fn endpoint(&self) -> &str;
}

// ============================================================================
// WebSocket (tokio-tungstenite)
// ============================================================================

pub struct WsDialer {
    url: String,
}

impl WsDialer {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Dialer for WsDialer {
    type Conn = WsConnection;

    async fn dial(&self) -> Result<WsConnection, FeedError> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|source| FeedError::Dial {
                url: self.url.clone(),
                source,
            })?;
        debug!(url = %self.url, "conectado");
        Ok(WsConnection { stream })
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedConnection for WsConnection {
    async fn read_frame(&mut self, deadline: Duration) -> Result<String, FeedError> {
        let stream = &mut self.stream;
        let read = async move {
            // ping/pong são respondidos pelo tungstenite; só dados voltam
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(text),
                    Some(Ok(Message::Binary(data))) => {
                        return String::from_utf8(data).map_err(|_| FeedError::NonUtf8)
                    }
                    Some(Ok(Message::Close(_))) | None => return Err(FeedError::Closed),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(FeedError::Read(e)),
                }
            }
        };

        tokio::time::timeout(deadline, read)
            .await
            .map_err(|_| FeedError::Timeout(deadline))?
    }

    async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.stream.close(None)).await {
            Ok(Ok(())) => debug!("conexão fechada"),
            Ok(Err(e)) => debug!("erro ao fechar conexão: {}", e),
            Err(_) => debug!("timeout ao fechar conexão"),
        }
    }
}
