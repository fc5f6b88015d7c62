//! Configuração via flags e variáveis de ambiente
//!
//! Uso:
//!   ./target/release/binance-depth-recorder -s btc -k future
//!   SYMBOL=eth MARKET=spot DATA_DIR=/data ./target/release/binance-depth-recorder

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::recovery::RedialBackoff;
use crate::rotation::RotationSettings;
use crate::types::MarketKind;

const FUTURES_BASE: &str = "wss://fstream.binance.com/ws";
const SPOT_BASE: &str = "wss://stream.binance.com:9443/ws";

/// Grava snapshots depth20 da Binance em CSV diário.
#[derive(Debug, Clone, Parser)]
#[command(name = "binance-depth-recorder", version)]
pub struct Args {
    /// Ativo base (ex.: btc); o par assinado é `<symbol>usdt`
    #[arg(short = 's', long, env = "SYMBOL", default_value = "btc")]
    pub symbol: String,

    /// Mercado: future ou spot
    #[arg(short = 'k', long, env = "MARKET", value_enum, default_value_t = MarketKind::Future)]
    pub market: MarketKind,

    /// Pasta raiz dos CSVs
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    pub data_dir: PathBuf,

    /// Pasta do log de erros
    #[arg(long, env = "LOG_DIR", default_value = "./log")]
    pub log_dir: PathBuf,

    /// Prazo de cada leitura em ms
    #[arg(long, env = "READ_TIMEOUT_MS", default_value_t = 3000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout_ms: u64,

    /// Segundos após 00:00 UTC em que o arquivo é trocado
    #[arg(long, env = "ROTATION_OFFSET_SECS", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..=2))]
    pub rotation_offset_secs: u64,

    /// Espera inicial entre tentativas de reconexão (0 = imediata)
    #[arg(long, env = "REDIAL_BACKOFF_MS", default_value_t = 0)]
    pub redial_backoff_ms: u64,

    /// Teto da espera entre tentativas (0 = 30s quando há espera inicial)
    #[arg(long, env = "REDIAL_BACKOFF_MAX_MS", default_value_t = 0)]
    pub redial_backoff_max_ms: u64,

    /// Substitui a URL do stream
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: Option<String>,
}

/// URL do stream `depth20@100ms` do par `<symbol>usdt`.
pub fn endpoint_url(kind: MarketKind, symbol: &str) -> String {
    let base = match kind {
        MarketKind::Future => FUTURES_BASE,
        MarketKind::Spot => SPOT_BASE,
    };
    format!("{}/{}usdt@depth20@100ms", base, symbol)
}

/// Configuração imutável, montada uma vez no início.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub symbol: String,
    pub market: MarketKind,
    pub endpoint: String,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub read_timeout: Duration,
    pub rotation_offset: Duration,
    pub redial: RedialBackoff,
}

impl RecorderConfig {
    pub fn from_args(args: Args) -> Self {
        let symbol = args.symbol.trim().to_lowercase();
        let endpoint = args
            .endpoint
            .unwrap_or_else(|| endpoint_url(args.market, &symbol));
        Self {
            endpoint,
            market: args.market,
            data_dir: args.data_dir,
            log_dir: args.log_dir,
            read_timeout: Duration::from_millis(args.read_timeout_ms),
            rotation_offset: Duration::from_secs(args.rotation_offset_secs),
            redial: RedialBackoff {
                base: Duration::from_millis(args.redial_backoff_ms),
                cap: Duration::from_millis(args.redial_backoff_max_ms),
            },
            symbol,
        }
    }

    /// `<log_dir>/<symbol><kind>_error.log`
    pub fn error_log_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("{}{}_error.log", self.symbol, self.market.as_str()))
    }

    pub fn rotation(&self) -> RotationSettings {
        RotationSettings {
            data_dir: self.data_dir.clone(),
            symbol: self.symbol.clone(),
            kind: self.market,
            offset: self.rotation_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> RecorderConfig {
        let args = Args::try_parse_from(std::iter::once("recorder").chain(argv.iter().copied()))
            .unwrap();
        RecorderConfig::from_args(args)
    }

    #[test]
    fn defaults_follow_futures_btc() {
        let cfg = parse(&[]);
        assert_eq!(cfg.symbol, "btc");
        assert_eq!(cfg.market, MarketKind::Future);
        assert_eq!(cfg.endpoint, "wss://fstream.binance.com/ws/btcusdt@depth20@100ms");
        assert_eq!(cfg.read_timeout, Duration::from_secs(3));
        assert_eq!(cfg.rotation_offset, Duration::from_secs(1));
        assert_eq!(cfg.redial, RedialBackoff::immediate());
        assert_eq!(cfg.error_log_path(), PathBuf::from("./log/btcfuture_error.log"));
    }

    #[test]
    fn spot_flags_select_spot_endpoint() {
        let cfg = parse(&["-s", "ETH", "-k", "spot", "--log-dir", "/var/log/rec"]);
        assert_eq!(cfg.symbol, "eth");
        assert_eq!(cfg.endpoint, "wss://stream.binance.com:9443/ws/ethusdt@depth20@100ms");
        assert_eq!(cfg.error_log_path(), PathBuf::from("/var/log/rec/ethspot_error.log"));
    }

    #[test]
    fn rotation_offset_is_bounded() {
        let argv = ["recorder", "--rotation-offset-secs", "5"];
        assert!(Args::try_parse_from(argv).is_err());
    }

    #[test]
    fn backoff_flag_alone_gets_finite_cap() {
        let cfg = parse(&["--redial-backoff-ms", "100"]);
        assert_eq!(cfg.redial.delay(0), Duration::from_millis(100));
        assert_eq!(cfg.redial.delay(20), Duration::from_secs(30));
    }

    #[test]
    fn endpoint_override_wins() {
        let cfg = parse(&["--endpoint", "ws://127.0.0.1:9000/ws"]);
        assert_eq!(cfg.endpoint, "ws://127.0.0.1:9000/ws");
    }
}
