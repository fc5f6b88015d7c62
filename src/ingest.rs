//! Loop de ingestão (Hot Path)
//!
//! Uma iteração: virada de dia pendente tem prioridade (checada sem
//! bloquear); senão lê uma mensagem, decodifica e grava a linha.
//!
//! Um pedido de parada ([`Stopper::stop`]) interrompe a espera pelo slot,
//! a leitura ou a recuperação. A conexão em mãos sempre volta ao slot antes
//! do retorno, para o desligamento conseguir fechá-la.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, warn};

use crate::error::{FeedError, RecordError};
use crate::extract::RowDecoder;
use crate::feed::FeedConnection;
use crate::recovery::FaultSignal;
use crate::rotation::Rotator;
use crate::slot::ConnectionSlot;
use crate::types::Row;

/// O que uma iteração do loop fez.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Rotated,
    Wrote,
    Stopped,
}

/// Pede a parada de um [`IngestLoop`].
#[derive(Clone)]
pub struct Stopper(Arc<watch::Sender<bool>>);

impl Stopper {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Completa quando a parada foi pedida (inclusive antes da chamada).
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stopped| *stopped).await;
}

pub struct IngestLoop<C: FeedConnection> {
    slot: Arc<ConnectionSlot<C>>,
    faults: FaultSignal,
    decoder: RowDecoder,
    rotator: Rotator,
    read_timeout: Duration,
    rows: u64,
    stop_tx: Arc<watch::Sender<bool>>,
    stop: watch::Receiver<bool>,
}

impl<C: FeedConnection> IngestLoop<C> {
    pub fn new(
        slot: Arc<ConnectionSlot<C>>,
        faults: FaultSignal,
        decoder: RowDecoder,
        rotator: Rotator,
        read_timeout: Duration,
    ) -> Self {
        let (stop_tx, stop) = watch::channel(false);
        Self {
            slot,
            faults,
            decoder,
            rotator,
            read_timeout,
            rows: 0,
            stop_tx: Arc::new(stop_tx),
            stop,
        }
    }

    pub fn stopper(&self) -> Stopper {
        Stopper(self.stop_tx.clone())
    }

    /// Roda até um erro fatal (`Err`) ou até a parada ser pedida (`Ok`).
    pub async fn run(&mut self) -> Result<(), RecordError> {
        loop {
            match self.step().await {
                Ok(Step::Stopped) => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    error!("erro fatal, encerrando: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Uma iteração do loop.
    pub async fn step(&mut self) -> Result<Step, RecordError> {
        if *self.stop.borrow() {
            return Ok(Step::Stopped);
        }
        if self.rotator.due() {
            self.rotator.rotate();
            return Ok(Step::Rotated);
        }

        let Some(row) = self.next_row().await? else {
            return Ok(Step::Stopped);
        };
        self.rotator.write(&row)?;
        self.rows += 1;
        Ok(Step::Wrote)
    }

    /// Lê até obter uma linha válida. Cada falha (leitura, timeout ou
    /// decodificação) passa pela recuperação antes da nova tentativa.
    ///
    /// `None` quando a parada foi pedida.
    async fn next_row(&mut self) -> Result<Option<Row>, RecordError> {
        loop {
            let mut conn = tokio::select! {
                conn = self.slot.acquire() => conn,
                _ = stop_requested(&mut self.stop) => return Ok(None),
            };
            let frame = tokio::select! {
                frame = conn.read_frame(self.read_timeout) => Some(frame),
                _ = stop_requested(&mut self.stop) => None,
            };
            let recv_ts = Utc::now().timestamp_millis();
            if let Err(mut surplus) = self.slot.release(conn) {
                warn!("slot ocupado ao devolver conexão, fechando");
                surplus.close().await;
            }
            let Some(frame) = frame else {
                return Ok(None);
            };

            let decoded = frame.and_then(|text| {
                self.decoder
                    .decode(&text, recv_ts)
                    .map_err(FeedError::from)
            });
            match decoded {
                Ok(row) => return Ok(Some(row)),
                Err(e) => {
                    tokio::select! {
                        result = self.faults.report(e) => result?,
                        _ = stop_requested(&mut self.stop) => return Ok(None),
                    }
                }
            }
        }
    }

    /// Linhas gravadas desde o início.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn rotator(&self) -> &Rotator {
        &self.rotator
    }

    /// Fecha o arquivo do dia.
    pub fn shutdown(self) -> Result<(), RecordError> {
        self.rotator.shutdown()
    }
}
