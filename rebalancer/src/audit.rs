//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use rebalancer_broker::{Account, Position};
use serde::Serialize;

use crate::config::TradingMode;
use crate::deviation::DeviationReport;
use crate::error::{Error, Result};
use crate::executor::{OrderIntent, OrderOutcome};
use crate::orchestrator::RebalanceOutcome;

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
        if let Some(parent) = path.parent() {
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

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

pub fn log_run_started(
    audit: &mut AuditLog,
    allocation_file: &str,
    mode: TradingMode,
    dry_run: bool,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "allocation_file": allocation_file,
            "mode": mode.to_string(),
            "dry_run": dry_run,
        }),
    )
}

pub fn log_positions(audit: &mut AuditLog, positions: &[Position], account: &Account) -> Result<()> {
    let pos_data: Vec<_> = positions
        .iter()
        .map(|p| {
            serde_json::json!({
                "symbol": p.symbol,
                "qty": p.quantity,
                "market_value": p.market_value,
                "price": p.current_price,
            })
        })
        .collect();

    audit.log(
        "positions_fetched",
        serde_json::json!({
            "positions": pos_data,
            "equity": account.equity,
            "buying_power": account.buying_power,
        }),
    )
}

pub fn log_deviation(audit: &mut AuditLog, report: &DeviationReport) -> Result<()> {
    let data = serde_json::to_value(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    audit.log("deviation_computed", data)
}

/// Log the plan that was (or, in a dry run, would have been) submitted.
pub fn log_plan(audit: &mut AuditLog, plan: &[OrderIntent], dry_run: bool) -> Result<()> {
    let orders: Vec<_> = plan
        .iter()
        .map(|o| {
            serde_json::json!({
                "symbol": o.symbol,
                "side": o.direction.as_str(),
                "shares": o.shares,
            })
        })
        .collect();
    audit.log(
        "plan_computed",
        serde_json::json!({ "orders": orders, "dry_run": dry_run }),
    )
}

/// Log every order of a finished pass, then the failure if there was one.
pub fn log_outcome(audit: &mut AuditLog, outcome: &RebalanceOutcome) -> Result<()> {
    for executed in &outcome.executed {
        let intent = &executed.intent;
        match &executed.outcome {
            OrderOutcome::Accepted {
                ack,
                quantity,
                attempts,
            } => audit.log(
                "order_accepted",
                serde_json::json!({
                    "symbol": intent.symbol,
                    "side": intent.direction.as_str(),
                    "sized": intent.shares,
                    "qty": quantity,
                    "attempts": attempts,
                    "broker_id": ack.id,
                    "broker_status": ack.status,
                }),
            )?,
            OrderOutcome::Skipped { quantity, attempts } => audit.log(
                "order_skipped",
                serde_json::json!({
                    "symbol": intent.symbol,
                    "side": intent.direction.as_str(),
                    "sized": intent.shares,
                    "qty": quantity,
                    "attempts": attempts,
                }),
            )?,
        }
    }

    if let (Some(intent), Some(err)) = (&outcome.failed, &outcome.error) {
        audit.log(
            "order_failed",
            serde_json::json!({
                "symbol": intent.symbol,
                "side": intent.direction.as_str(),
                "sized": intent.shares,
                "error": err.to_string(),
            }),
        )?;
    }
    Ok(())
}

pub fn log_run_completed(audit: &mut AuditLog, message: &str) -> Result<()> {
    audit.log("run_completed", serde_json::json!({ "message": message }))
}

pub fn log_run_failed(audit: &mut AuditLog, err: &Error) -> Result<()> {
    audit.log("run_failed", serde_json::json!({ "error": err.to_string() }))
}
