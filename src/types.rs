//! Tipos e estruturas de dados

use std::fmt;

/// Número de níveis de preço gravados por lado do livro.
pub const DEPTH_LEVELS: usize = 20;

/// Largura fixa de uma linha: timestamp + 20 pares de bid + 20 pares de ask.
pub const ROW_WIDTH: usize = 1 + 4 * DEPTH_LEVELS;

/// Lado do livro de ofertas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    /// Índice da coluna de preço do nível `level` (a quantidade fica em `+1`).
    pub fn price_index(self, level: usize) -> usize {
        match self {
            Side::Bid => 2 * level + 1,
            Side::Ask => 2 * (level + DEPTH_LEVELS) + 1,
        }
    }
}

/// Classe de mercado assinada: futuros (USDⓈ-M) ou spot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MarketKind {
    Future,
    Spot,
}

impl MarketKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketKind::Future => "future",
            MarketKind::Spot => "spot",
        }
    }
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uma linha do CSV: sempre exatamente `ROW_WIDTH` campos.
///
/// Níveis ausentes no snapshot ficam como string vazia, nunca encurtam a linha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    /// Linha com todos os campos vazios.
    pub fn blank() -> Self {
        Self {
            fields: vec![String::new(); ROW_WIDTH],
        }
    }

    pub fn set_timestamp(&mut self, ts_ms: i64) {
        self.fields[0] = ts_ms.to_string();
    }

    /// Grava preço e quantidade do nível `level` (0 = melhor preço).
    pub fn set_level(&mut self, side: Side, level: usize, price: String, quantity: String) {
        let idx = side.price_index(level);
        self.fields[idx] = price;
        self.fields[idx + 1] = quantity;
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
