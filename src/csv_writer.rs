//! Arquivo CSV diário
//!
//! Um arquivo por dia UTC, sem cabeçalho, com uma linha por snapshot.
//! Cada linha é descarregada no disco logo após ser escrita: um crash perde
//! no máximo a linha em andamento.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::error::RecordError;
use crate::types::{MarketKind, Row};

/// Caminho do arquivo de um dia: `<data_dir>/<Y>-<M>-<D>/<symbol><kind>-<Y>-<M>-<D>.csv`.
///
/// Mês e dia não levam zero à esquerda (`2024-3-7`).
pub fn daily_path(data_dir: &Path, symbol: &str, kind: MarketKind, date: NaiveDate) -> PathBuf {
    let day = format!("{}-{}-{}", date.year(), date.month(), date.day());
    data_dir
        .join(&day)
        .join(format!("{}{}-{}.csv", symbol, kind.as_str(), day))
}

/// Arquivo de saída de um dia.
pub struct OutputFile {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

impl OutputFile {
    /// Abre (ou continua, em modo append) o arquivo do dia `date`.
    ///
    /// A pasta do dia é criada se não existir; falha ao criá-la só gera
    /// warning, o erro real aparece ao abrir o arquivo.
    pub fn open(
        data_dir: &Path,
        symbol: &str,
        kind: MarketKind,
        date: NaiveDate,
    ) -> Result<Self, RecordError> {
        let path = daily_path(data_dir, symbol, kind, date);
        if let Some(dir) = path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                warn!(dir = %dir.display(), "falha ao criar pasta do dia: {}", e);
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| RecordError::Open {
                path: path.clone(),
                source,
            })?;

        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        info!(path = %path.display(), "arquivo de saída aberto");
        Ok(Self {
            path,
            writer,
            rows: 0,
        })
    }

    /// Escreve uma linha e faz flush imediatamente.
    pub fn append(&mut self, row: &Row) -> Result<(), RecordError> {
        self.writer.write_record(row.fields())?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    /// Fecha o arquivo, descarregando o que restar no buffer.
    pub fn close(mut self) -> Result<(), RecordError> {
        self.writer.flush()?;
        info!(path = %self.path.display(), rows = self.rows, "arquivo de saída fechado");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Linhas gravadas desde a abertura.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}
