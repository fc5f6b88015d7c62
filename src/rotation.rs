//! Rotação diária do arquivo de saída
//!
//! A cada abertura de arquivo (início e cada virada) o próximo prazo é
//! calculado como "início do próximo dia UTC + offset". O offset de 1-2s
//! evita corrida com o timestamp do próprio feed na virada do dia.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::csv_writer::OutputFile;
use crate::error::RecordError;
use crate::types::{MarketKind, Row};

const SECS_PER_DAY: u64 = 86_400;

/// Fonte da hora de parede. Existe para os testes controlarem a virada.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Relógio do sistema.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Tempo até a próxima virada: próximo 00:00:00 UTC + `offset`.
///
/// Sempre positivo e nunca maior que 86400s + `offset`.
pub fn next_rotation_delay(now: DateTime<Utc>, offset: Duration) -> Duration {
    let next_midnight = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());

    let until_midnight = next_midnight
        .and_then(|m| (m - now).to_std().ok())
        .unwrap_or(Duration::from_secs(SECS_PER_DAY));

    until_midnight + offset
}

/// Parâmetros fixos da rotação.
#[derive(Debug, Clone)]
pub struct RotationSettings {
    pub data_dir: PathBuf,
    pub symbol: String,
    pub kind: MarketKind,
    pub offset: Duration,
}

/// Dono do arquivo do dia e do prazo da próxima troca.
pub struct Rotator {
    settings: RotationSettings,
    clock: Arc<dyn WallClock>,
    current: Option<OutputFile>,
    deadline: Instant,
}

impl Rotator {
    /// Abre o arquivo do dia corrente e arma o prazo. Falhar aqui é fatal.
    pub fn start(
        settings: RotationSettings,
        clock: Arc<dyn WallClock>,
    ) -> Result<Self, RecordError> {
        let now = clock.now();
        let file = OutputFile::open(
            &settings.data_dir,
            &settings.symbol,
            settings.kind,
            now.date_naive(),
        )?;
        let deadline = Instant::now() + next_rotation_delay(now, settings.offset);
        Ok(Self {
            settings,
            clock,
            current: Some(file),
            deadline,
        })
    }

    /// O prazo já passou? Não bloqueia.
    pub fn due(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Fecha o arquivo atual, abre o do dia corrente e rearma o prazo.
    ///
    /// Falha ao abrir o novo arquivo não é fatal: fica registrada como
    /// warning e a próxima escrita falha com `NoOutputFile`.
    pub fn rotate(&mut self) {
        if let Some(old) = self.current.take() {
            let path = old.path().to_path_buf();
            if let Err(e) = old.close() {
                warn!(path = %path.display(), "falha ao fechar arquivo na rotação: {}", e);
            }
        }

        let now = self.clock.now();
        match OutputFile::open(
            &self.settings.data_dir,
            &self.settings.symbol,
            self.settings.kind,
            now.date_naive(),
        ) {
            Ok(file) => self.current = Some(file),
            Err(e) => warn!("falha ao criar arquivo na rotação: {}", e),
        }

        let delay = next_rotation_delay(now, self.settings.offset);
        self.deadline = Instant::now() + delay;
        info!(next_in_secs = delay.as_secs(), "rotação concluída");
    }

    /// Grava uma linha no arquivo do dia.
    pub fn write(&mut self, row: &Row) -> Result<(), RecordError> {
        match self.current.as_mut() {
            Some(file) => file.append(row),
            None => Err(RecordError::NoOutputFile),
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(OutputFile::path)
    }

    /// Fecha o arquivo atual. O prazo pendente é descartado junto com o rotator.
    pub fn shutdown(mut self) -> Result<(), RecordError> {
        match self.current.take() {
            Some(file) => file.close(),
            None => Ok(()),
        }
    }
}
