//! Log de erros em arquivo (append-only)

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Sem `RUST_LOG`, o arquivo recebe só warnings e o erro fatal.
const DEFAULT_DIRECTIVE: &str = "warn";

fn subscriber<W>(writer: W, filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish()
}

/// Abre (em append) o log de erros e instala o subscriber global.
///
/// Cada linha leva o nível (`WARN`, `ERROR`) como prefixo.
pub fn init(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    tracing::subscriber::set_global_default(subscriber(Mutex::new(file), filter))
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{error, info, warn};

    #[test]
    fn default_filter_keeps_only_warnings_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("btcfuture_error.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();

        let sub = subscriber(Mutex::new(file), EnvFilter::new(DEFAULT_DIRECTIVE));
        tracing::subscriber::with_default(sub, || {
            info!("arquivo de saída aberto");
            warn!("falha na leitura: timeout");
            error!("erro fatal, encerrando");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("arquivo de saída aberto"));
        assert!(content.contains("WARN"));
        assert!(content.contains("falha na leitura: timeout"));
        assert!(content.contains("ERROR"));
        assert_eq!(content.lines().count(), 2);
    }
}
