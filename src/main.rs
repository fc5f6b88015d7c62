//! Gravador de Order Book - Binance WebSocket depth20
//!
//! Conecta ao stream de profundidade da Binance (futuros ou spot) e grava
//! cada snapshot de 20 níveis em um CSV por dia UTC. Quedas de conexão são
//! recuperadas em background sem intervenção do operador.
//!
//! Uso:
//!   ./target/release/binance-depth-recorder -s btc -k future
//!   SYMBOL=eth MARKET=spot ./target/release/binance-depth-recorder

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use depth_recorder::config::{Args, RecorderConfig};
use depth_recorder::extract::{BookSchema, RowDecoder};
use depth_recorder::feed::{Dialer, FeedConnection, WsDialer};
use depth_recorder::ingest::IngestLoop;
use depth_recorder::logging;
use depth_recorder::recovery::{fault_channel, FaultRecovery};
use depth_recorder::rotation::{Rotator, SystemClock};
use depth_recorder::slot::ConnectionSlot;

/// Código de saída quando o processo é interrompido por sinal.
const EXIT_INTERRUPTED: i32 = 130;

// ============================================================================
// Sinais de Encerramento
// ============================================================================

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ============================================================================
// Função Principal
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let config = RecorderConfig::from_args(Args::parse());

    let log_path = config.error_log_path();
    logging::init(&log_path)
        .with_context(|| format!("falha ao abrir log de erros {}", log_path.display()))?;

    eprintln!("Conectando a {}...", config.endpoint);
    eprintln!("Símbolo: {} ({})", config.symbol, config.market);
    eprintln!("Dados: {}", config.data_dir.display());
    eprintln!("Log de erros: {}", log_path.display());

    // ========================================================================
    // Arquivo do Dia + Primeira Conexão (falhas aqui são fatais)
    // ========================================================================

    let rotator = match Rotator::start(config.rotation(), Arc::new(SystemClock)) {
        Ok(rotator) => rotator,
        Err(e) => {
            error!("falha ao abrir arquivo inicial: {}", e);
            return Err(e).context("falha ao abrir arquivo inicial");
        }
    };

    let dialer = Arc::new(WsDialer::new(config.endpoint.clone()));
    let first = match dialer.dial().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("falha na conexão inicial: {}", e);
            return Err(e).context("falha na conexão inicial");
        }
    };
    info!(endpoint = dialer.endpoint(), "conectado");
    eprintln!("Conectado! Gravando snapshots...\n");

    // ========================================================================
    // Tarefas: Recuperação (background) + Ingestão (foreground)
    // ========================================================================

    let slot = Arc::new(ConnectionSlot::with(first));
    let (faults, fault_rx) = fault_channel();
    let recovery = FaultRecovery::new(dialer.clone(), slot.clone(), fault_rx, config.redial).spawn();

    let decoder = RowDecoder::new(BookSchema::for_market(config.market));
    let mut ingest = IngestLoop::new(slot.clone(), faults, decoder, rotator, config.read_timeout);

    // Com o sinal o loop larga a leitura em andamento e devolve a conexão
    // ao slot, onde a finalização a encontra para fechar.
    let stopper = ingest.stopper();
    let outcome = {
        let run = ingest.run();
        tokio::pin!(run);
        tokio::select! {
            result = &mut run => result,
            _ = shutdown_signal() => {
                info!("sinal de encerramento recebido");
                stopper.stop();
                run.await
            }
        }
    };

    // ========================================================================
    // Finalização
    // ========================================================================

    let total = ingest.rows();
    recovery.abort();
    let _ = recovery.await;
    if let Some(mut conn) = slot.drain() {
        conn.close().await;
    }
    if let Err(e) = ingest.shutdown() {
        error!("falha ao fechar arquivo de saída: {}", e);
    }

    eprintln!("\n=== Gravação Finalizada ===");
    eprintln!("Total de linhas gravadas: {}", total);

    match outcome {
        Ok(()) => std::process::exit(EXIT_INTERRUPTED),
        Err(e) => Err(e).context("gravação interrompida por erro fatal"),
    }
}
