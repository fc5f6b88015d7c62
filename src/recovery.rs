//! Recuperação de falhas (tarefa em background)
//!
//! O leitor reporta a falha e fica parado em [`FaultSignal::report`] até esta
//! tarefa ter fechado a conexão antiga, discado de novo e devolvido a conexão
//! nova ao slot. Nenhuma leitura acontece antes disso.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{FeedError, RecordError};
use crate::feed::{Dialer, FeedConnection};
use crate::slot::ConnectionSlot;

/// Uma falha reportada pelo leitor, com o canal de confirmação.
#[derive(Debug)]
pub struct FaultReport {
    pub error: FeedError,
    done: oneshot::Sender<()>,
}

/// Lado do leitor do handshake de falha.
#[derive(Clone)]
pub struct FaultSignal {
    tx: mpsc::Sender<FaultReport>,
}

/// Cria o canal de falhas. Capacidade 1: só existe um leitor e ele nunca
/// tem mais de um report pendente.
pub fn fault_channel() -> (FaultSignal, mpsc::Receiver<FaultReport>) {
    let (tx, rx) = mpsc::channel(1);
    (FaultSignal { tx }, rx)
}

impl FaultSignal {
    /// Reporta a falha e espera a reconexão terminar.
    ///
    /// # Retorno
    /// `Ok(())` quando já existe uma conexão nova no slot;
    /// `RecoveryGone` se a tarefa de recuperação não existe mais.
    pub async fn report(&self, error: FeedError) -> Result<(), RecordError> {
        let (done, recovered) = oneshot::channel();
        self.tx
            .send(FaultReport { error, done })
            .await
            .map_err(|_| RecordError::RecoveryGone)?;
        recovered.await.map_err(|_| RecordError::RecoveryGone)
    }
}

/// Teto usado quando só `base` é configurado.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Espera entre tentativas de dial.
///
/// `base` zero: tenta de novo imediatamente, sem limite de tentativas.
/// `cap` zero com `base` positivo usa [`DEFAULT_BACKOFF_CAP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedialBackoff {
    pub base: Duration,
    pub cap: Duration,
}

impl RedialBackoff {
    pub fn immediate() -> Self {
        Self::default()
    }

    /// Atraso antes da tentativa seguinte à falha número `attempt` (0 = primeira).
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        let cap = if self.cap.is_zero() {
            DEFAULT_BACKOFF_CAP
        } else {
            self.cap
        };
        self.base.saturating_mul(factor).min(cap)
    }
}

pub struct FaultRecovery<D: Dialer> {
    dialer: Arc<D>,
    slot: Arc<ConnectionSlot<D::Conn>>,
    faults: mpsc::Receiver<FaultReport>,
    backoff: RedialBackoff,
}

impl<D: Dialer> FaultRecovery<D> {
    pub fn new(
        dialer: Arc<D>,
        slot: Arc<ConnectionSlot<D::Conn>>,
        faults: mpsc::Receiver<FaultReport>,
        backoff: RedialBackoff,
    ) -> Self {
        Self {
            dialer,
            slot,
            faults,
            backoff,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Atende reports até o canal ser fechado.
    pub async fn run(mut self) {
        while let Some(report) = self.faults.recv().await {
            warn!("falha na leitura: {}", report.error);
            self.recover().await;
            // o leitor pode ter sido cancelado enquanto esperava
            let _ = report.done.send(());
        }
        debug!("canal de falhas fechado, recuperação encerrada");
    }

    async fn recover(&self) {
        let mut old = self.slot.acquire().await;
        old.close().await;

        let mut failures = 0u32;
        let conn = loop {
            match self.dialer.dial().await {
                Ok(conn) => break conn,
                Err(e) => {
                    if failures == 0 {
                        warn!(endpoint = self.dialer.endpoint(), "falha ao reconectar: {}", e);
                    } else {
                        debug!(attempt = failures + 1, "falha ao reconectar: {}", e);
                    }
                    let delay = self.backoff.delay(failures);
                    if delay.is_zero() {
                        tokio::task::yield_now().await;
                    } else {
                        tokio::time::sleep(delay).await;
                    }
                    failures = failures.saturating_add(1);
                }
            }
        };

        if let Err(mut surplus) = self.slot.release(conn) {
            warn!("slot ocupado após reconexão, descartando conexão nova");
            surplus.close().await;
        }
        info!(failed_attempts = failures, "reconectado");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_policy_never_waits() {
        let backoff = RedialBackoff::immediate();
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(50), Duration::ZERO);
    }

    #[test]
    fn exponential_policy_is_capped() {
        let backoff = RedialBackoff {
            base: Duration::from_millis(100),
            cap: Duration::from_secs(1),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(100));
        assert_eq!(backoff.delay(1), Duration::from_millis(200));
        assert_eq!(backoff.delay(3), Duration::from_millis(800));
        assert_eq!(backoff.delay(4), Duration::from_secs(1));
        assert_eq!(backoff.delay(40), Duration::from_secs(1));
    }

    #[test]
    fn base_without_cap_stays_bounded() {
        let backoff = RedialBackoff {
            base: Duration::from_millis(100),
            cap: Duration::ZERO,
        };
        assert_eq!(backoff.delay(2), Duration::from_millis(400));
        for attempt in [15, 20, 31, u32::MAX] {
            assert_eq!(backoff.delay(attempt), DEFAULT_BACKOFF_CAP);
        }
    }

    #[tokio::test]
    async fn report_fails_when_recovery_is_gone() {
        let (signal, rx) = fault_channel();
        drop(rx);
        assert!(matches!(
            signal.report(FeedError::Closed).await,
            Err(RecordError::RecoveryGone)
        ));
    }
}
