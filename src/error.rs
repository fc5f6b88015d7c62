//! Taxonomia de erros do gravador

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Falhas do lado do feed. Todas são recuperáveis em regime: disparam o
/// ciclo de reconexão. Só o primeiro dial é fatal (tratado no `main`).
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("falha ao conectar em {url}: {source}")]
    Dial {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("erro de leitura no websocket: {0}")]
    Read(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("nenhuma mensagem em {0:?}")]
    Timeout(Duration),

    #[error("conexão encerrada pelo servidor")]
    Closed,

    #[error("frame binário não é UTF-8")]
    NonUtf8,

    #[error("mensagem inválida: {0}")]
    Decode(#[from] DecodeError),
}

/// Erros de decodificação do snapshot. Chegam ao loop como falha de leitura.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("JSON malformado: {0}")]
    Json(#[from] serde_json::Error),

    #[error("campo ausente: {0}")]
    MissingField(String),

    #[error("campo {0} não é um inteiro")]
    NotAnInteger(String),

    #[error("campo {0} não é uma lista")]
    NotAnArray(String),
}

/// Erros locais de gravação.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("falha ao abrir {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("falha ao gravar linha: {0}")]
    Write(#[from] csv::Error),

    #[error("falha ao descarregar arquivo: {0}")]
    Flush(#[from] io::Error),

    #[error("nenhum arquivo de saída aberto (rotação anterior falhou)")]
    NoOutputFile,

    #[error("tarefa de reconexão encerrada")]
    RecoveryGone,
}
