//! Extração do snapshot de profundidade (Hot Path)
//!
//! Converte uma mensagem bruta do stream `depth20` numa [`Row`] de largura
//! fixa. O mapeamento depende do mercado (futuros e spot usam nomes de campo
//! diferentes), mas o algoritmo é o mesmo para qualquer esquema.

use serde_json::Value;

use crate::error::DecodeError;
use crate::types::{MarketKind, Row, Side, DEPTH_LEVELS};

/// De onde vem o timestamp gravado na coluna 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampSource {
    /// JSON pointer para um inteiro em milissegundos (ex.: `/T`).
    Field(String),
    /// Hora local de recebimento. O `depth20` do spot não traz timestamp.
    ReceiveTime,
}

/// Formato de cada nível de preço.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelShape {
    /// `["preço", "quantidade"]`
    Pair,
    /// `{"<price>": ..., "<quantity>": ...}`
    Object { price: String, quantity: String },
}

/// Esquema de decodificação de um venue/mercado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSchema {
    pub timestamp: TimestampSource,
    pub bids: String,
    pub asks: String,
    pub level: LevelShape,
}

impl BookSchema {
    /// Esquemas dos streams `<symbol>@depth20@100ms` da Binance.
    pub fn for_market(kind: MarketKind) -> Self {
        match kind {
            MarketKind::Future => Self {
                timestamp: TimestampSource::Field("/T".to_string()),
                bids: "/b".to_string(),
                asks: "/a".to_string(),
                level: LevelShape::Pair,
            },
            MarketKind::Spot => Self {
                timestamp: TimestampSource::ReceiveTime,
                bids: "/bids".to_string(),
                asks: "/asks".to_string(),
                level: LevelShape::Pair,
            },
        }
    }
}

/// Decodificador puro: mesma mensagem + mesmo `recv_ts` = mesma linha.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    schema: BookSchema,
}

impl RowDecoder {
    pub fn new(schema: BookSchema) -> Self {
        Self { schema }
    }

    /// Achata uma mensagem numa linha de 81 campos.
    ///
    /// # Argumentos
    /// * `text` - JSON da mensagem do WebSocket
    /// * `recv_ts` - hora de recebimento em ms, usada quando o esquema não
    ///   traz timestamp próprio
    ///
    /// # Retorno
    /// A linha, ou `DecodeError` se o JSON for inválido ou faltar um campo
    /// obrigatório. Níveis ausentes não são erro: viram strings vazias.
    pub fn decode(&self, text: &str, recv_ts: i64) -> Result<Row, DecodeError> {
        let message: Value = serde_json::from_str(text)?;
        let mut row = Row::blank();

        let ts = match &self.schema.timestamp {
            TimestampSource::Field(pointer) => message
                .pointer(pointer)
                .ok_or_else(|| DecodeError::MissingField(pointer.clone()))?
                .as_i64()
                .ok_or_else(|| DecodeError::NotAnInteger(pointer.clone()))?,
            TimestampSource::ReceiveTime => recv_ts,
        };
        row.set_timestamp(ts);

        self.fill_side(&message, &self.schema.bids, Side::Bid, &mut row)?;
        self.fill_side(&message, &self.schema.asks, Side::Ask, &mut row)?;
        Ok(row)
    }

    fn fill_side(
        &self,
        message: &Value,
        pointer: &str,
        side: Side,
        row: &mut Row,
    ) -> Result<(), DecodeError> {
        let levels = message
            .pointer(pointer)
            .ok_or_else(|| DecodeError::MissingField(pointer.to_string()))?
            .as_array()
            .ok_or_else(|| DecodeError::NotAnArray(pointer.to_string()))?;

        for (i, level) in levels.iter().take(DEPTH_LEVELS).enumerate() {
            let (price, quantity) = match &self.schema.level {
                LevelShape::Pair => (level.get(0), level.get(1)),
                LevelShape::Object { price, quantity } => {
                    (level.get(price.as_str()), level.get(quantity.as_str()))
                }
            };
            row.set_level(side, i, field_text(price), field_text(quantity));
        }
        Ok(())
    }
}

/// Texto do campo como aparece no CSV: strings sem aspas, números no formato
/// JSON, ausente/null vazio.
fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
