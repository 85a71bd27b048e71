//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use pairbalance::{Evaluation, SwapOrder, TokenPair};
use pairbalance_broker::SwapReceipt;
use serde::Serialize;
use serde_json::json;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn log_run_started(
    audit: &mut AuditLog,
    wallet: &str,
    pair: &TokenPair,
    threshold: f64,
    dry_run: bool,
) -> Result<()> {
    audit.log(
        "run_started",
        json!({
            "wallet": wallet,
            "token_a": pair.a,
            "token_b": pair.b,
            "threshold_percent": threshold,
            "dry_run": dry_run,
        }),
    )
}

/// `kind` is `"snapshot"` or `"initial_value"`.
pub fn log_baseline_captured(
    audit: &mut AuditLog,
    kind: &'static str,
    data: serde_json::Value,
) -> Result<()> {
    audit.log("baseline_captured", json!({ "kind": kind, "value": data }))
}

pub fn log_tick_evaluated(audit: &mut AuditLog, evaluation: &Evaluation) -> Result<()> {
    audit.log(
        "tick_evaluated",
        json!({
            "value_a": evaluation.value_a,
            "value_b": evaluation.value_b,
            "total": evaluation.total,
            "allocation_a": evaluation.allocation_a,
            "allocation_b": evaluation.allocation_b,
            "deviation": evaluation.deviation,
            "threshold": evaluation.threshold,
            "profit": evaluation.pnl.profit,
            "decision": evaluation.decision.label(),
        }),
    )
}

pub fn log_tick_skipped(audit: &mut AuditLog, reason: &str) -> Result<()> {
    audit.log("tick_skipped", json!({ "reason": reason }))
}

fn order_fields(order: &SwapOrder) -> serde_json::Value {
    json!({
        "direction": order.direction.to_string(),
        "input_mint": order.input_mint,
        "output_mint": order.output_mint,
        "tokens": order.tokens,
        "amount": order.amount,
        "excess_value": order.excess_value,
    })
}

pub fn log_swap_submitted(audit: &mut AuditLog, order: &SwapOrder) -> Result<()> {
    audit.log("swap_submitted", order_fields(order))
}

pub fn log_swap_succeeded(
    audit: &mut AuditLog,
    order: &SwapOrder,
    receipt: &SwapReceipt,
) -> Result<()> {
    let mut data = order_fields(order);
    data["signature"] = json!(receipt.signature);
    data["confirmed_by_router"] = json!(receipt.confirmed_by_router);
    audit.log("swap_succeeded", data)
}

pub fn log_swap_failed(audit: &mut AuditLog, order: &SwapOrder, error: &str) -> Result<()> {
    let mut data = order_fields(order);
    data["error"] = json!(error);
    audit.log("swap_failed", data)
}
