//! Gravador de Order Book - Binance WebSocket depth20
//!
//! Consome o stream `<symbol>usdt@depth20@100ms` (futuros ou spot) e grava
//! cada snapshot como uma linha de 81 colunas num CSV diário, reconectando
//! sozinho a cada queda.
//!
//! Duas tarefas dividem a mesma conexão:
//! - [`ingest::IngestLoop`]: lê → decodifica → grava → checa a virada do dia
//! - [`recovery::FaultRecovery`]: fecha a conexão quebrada, disca de novo e
//!   devolve a nova ao [`slot::ConnectionSlot`]

pub mod config;
pub mod csv_writer;
pub mod error;
pub mod extract;
pub mod feed;
pub mod ingest;
pub mod logging;
pub mod recovery;
pub mod rotation;
pub mod slot;
pub mod types;
