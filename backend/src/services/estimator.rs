//! BuildAdvisor estimates
//!
//! The model proposes a bill of materials, the price table prices it, and
//! the model writes a short plan around the result. Only the pricing step is
//! ours; it never trusts a model-supplied price.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shared::{round2, BomLine, Estimate, EstimateLine, UNPRICED_SUFFIX};

use crate::error::{AppError, AppResult};
use crate::external::{AiError, OpenAiClient};
use crate::pricing::{PriceStore, PriceTable};

/// Narrative used when the model cannot write one
pub const DEFAULT_NARRATIVE: &str = "Here’s the step-by-step plan and a materials summary.";

/// Price a bill of materials against the table.
///
/// Lines without a price are kept, marked unpriced, with zero price and
/// total. The estimate total sums the unrounded line totals.
pub fn price_bom_lines(lines: &[BomLine], table: &PriceTable) -> Estimate {
    let mut estimate = Estimate::default();
    let mut total = 0.0;

    for line in lines {
        let Some(unit_price) = table.get(line.key) else {
            estimate.lines.push(EstimateLine {
                key: line.key,
                name: format!("{}{}", line.key.pretty_name(), UNPRICED_SUFFIX),
                qty: line.qty,
                unit: line.unit,
                unit_price: 0.0,
                total: 0.0,
            });
            continue;
        };
        let line_total = line.qty * unit_price;
        total += line_total;
        estimate.lines.push(EstimateLine {
            key: line.key,
            name: line.key.pretty_name(),
            qty: round2(line.qty),
            unit: line.unit,
            unit_price: round2(unit_price),
            total: round2(line_total),
        });
    }

    estimate.total = round2(total);
    estimate
}

/// Response body shared by the chat and document estimators
#[derive(Debug, Serialize)]
pub struct EstimateReply {
    pub ok: bool,
    pub assistant: String,
    pub spec: Value,
    pub estimate: Estimate,
    pub ai_notes: String,
}

pub struct EstimatorService {
    prices: PriceStore,
    openai: Arc<OpenAiClient>,
}

impl EstimatorService {
    pub fn new(prices: PriceStore, openai: Arc<OpenAiClient>) -> Self {
        Self { prices, openai }
    }

    /// The current price table, provided the model is configured too
    pub fn ready(&self) -> AppResult<Arc<PriceTable>> {
        let table = self.prices.current().map_err(AppError::PricesUnavailable)?;
        if !self.openai.is_configured() {
            return Err(AppError::AiNotConfigured);
        }
        Ok(table)
    }

    /// Estimate a project described in free text. A failed BOM proposal
    /// degrades to an empty estimate.
    pub async fn chat(&self, message: &str, spec: Value) -> AppResult<EstimateReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("message", "Empty message"));
        }
        let table = self.ready()?;

        let (lines, notes) = match self.openai.propose_bom(message, &spec).await {
            Ok(proposal) => (proposal.lines, proposal.notes),
            Err(e) => {
                tracing::warn!("BOM proposal failed: {}", e);
                (Vec::new(), String::new())
            }
        };
        let estimate = price_bom_lines(&lines, &table);
        let assistant = self
            .openai
            .expand_steps(message, &spec, &estimate, DEFAULT_NARRATIVE)
            .await;

        Ok(EstimateReply {
            ok: true,
            assistant,
            spec,
            estimate,
            ai_notes: notes,
        })
    }

    /// Estimate from drawings, photos or PDFs already stored as uploads
    pub async fn extract(&self, files: &[PathBuf], spec: Value) -> AppResult<EstimateReply> {
        if files.is_empty() {
            return Err(AppError::validation("file_ids", "No files provided"));
        }
        let table = self.ready()?;

        let proposal = self
            .openai
            .propose_bom_from_files(files, &spec)
            .await
            .map_err(|e| match e {
                AiError::NotConfigured => AppError::AiNotConfigured,
                other => AppError::AiExtraction(other.to_string()),
            })?;
        let estimate = price_bom_lines(&proposal.lines, &table);
        let assistant = self
            .openai
            .expand_steps("Document analysis", &spec, &estimate, DEFAULT_NARRATIVE)
            .await;

        Ok(EstimateReply {
            ok: true,
            assistant,
            spec,
            estimate,
            ai_notes: proposal.notes,
        })
    }
}
