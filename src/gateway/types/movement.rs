//! Movement and statement wire types
//!
//! Field names on the wire are fixed by existing clients (`valor`, `tipo`,
//! `descricao`, `saldo`, ...); Rust-side names follow the ledger vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ledger::{MovementReceipt, MovementRecord, MovementRequest, Statement};

/// Movement submission body
///
/// Missing fields default to zero values so they fail business validation
/// (422) rather than payload parsing (400).
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MovementPayload {
    /// Amount in minor units, positive
    #[serde(rename = "valor", default)]
    #[schema(example = 1000)]
    pub amount: i64,
    /// `"c"` credit or `"d"` debit
    #[serde(rename = "tipo", default)]
    #[schema(example = "d")]
    pub kind: String,
    /// 1 to 10 characters
    #[serde(rename = "descricao", default)]
    #[schema(example = "groceries")]
    pub description: Option<String>,
}

impl From<MovementPayload> for MovementRequest {
    fn from(p: MovementPayload) -> Self {
        MovementRequest::new(p.amount, p.kind, p.description.unwrap_or_default())
    }
}

/// Result of an accepted movement
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementResponse {
    #[serde(rename = "limite")]
    #[schema(example = 100000)]
    pub limit: i64,
    #[serde(rename = "saldo")]
    #[schema(example = -1000)]
    pub balance: i64,
}

impl From<MovementReceipt> for MovementResponse {
    fn from(r: MovementReceipt) -> Self {
        Self {
            limit: r.limit,
            balance: r.balance,
        }
    }
}

/// Balance block of a statement
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceView {
    pub total: i64,
    #[serde(rename = "data_extrato")]
    pub snapshot_time: DateTime<Utc>,
    #[serde(rename = "limite")]
    pub limit: i64,
}

/// One movement in a statement
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementView {
    #[serde(rename = "valor")]
    pub amount: i64,
    #[serde(rename = "tipo")]
    pub kind: String,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "realizada_em")]
    pub occurred_at: DateTime<Utc>,
}

impl From<MovementRecord> for MovementView {
    fn from(m: MovementRecord) -> Self {
        Self {
            amount: m.amount,
            kind: m.kind.as_str().to_string(),
            description: m.description,
            occurred_at: m.occurred_at,
        }
    }
}

/// Account statement
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatementResponse {
    #[serde(rename = "saldo")]
    pub balance: BalanceView,
    /// Newest first, at most 10
    #[serde(rename = "ultimas_transacoes")]
    pub recent: Vec<MovementView>,
}

impl From<Statement> for StatementResponse {
    fn from(s: Statement) -> Self {
        Self {
            balance: BalanceView {
                total: s.balance,
                snapshot_time: s.snapshot_time,
                limit: s.limit,
            },
            recent: s.recent.into_iter().map(MovementView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MovementKind;

    #[test]
    fn test_payload_wire_names() {
        let p: MovementPayload =
            serde_json::from_str(r#"{"valor": 1000, "tipo": "c", "descricao": "salary"}"#).unwrap();
        let req = MovementRequest::from(p);
        assert_eq!(req, MovementRequest::credit(1000, "salary"));
    }

    #[test]
    fn test_payload_missing_fields_default() {
        let p: MovementPayload = serde_json::from_str(r#"{"valor": 5, "descricao": null}"#).unwrap();
        let req = MovementRequest::from(p);
        assert_eq!(req.kind, "");
        assert_eq!(req.description, "");
    }

    #[test]
    fn test_payload_fractional_amount_is_malformed() {
        let res = serde_json::from_str::<MovementPayload>(r#"{"valor": 1.5, "tipo": "c", "descricao": "x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_statement_wire_shape() {
        let now = Utc::now();
        let statement = Statement {
            balance: -500,
            limit: 1000,
            snapshot_time: now,
            recent: vec![MovementRecord {
                amount: 500,
                kind: MovementKind::Debit,
                description: "rent".into(),
                occurred_at: now,
            }],
        };
        let json = serde_json::to_value(StatementResponse::from(statement)).unwrap();
        assert_eq!(json["saldo"]["total"], -500);
        assert_eq!(json["saldo"]["limite"], 1000);
        assert!(json["saldo"]["data_extrato"].is_string());
        assert_eq!(json["ultimas_transacoes"][0]["tipo"], "d");
        assert_eq!(json["ultimas_transacoes"][0]["valor"], 500);
        assert_eq!(json["ultimas_transacoes"][0]["descricao"], "rent");
    }
}
