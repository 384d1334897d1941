//! OpenAI chat-completions client
//!
//! Builds prompts for the estimator and the staff drafting helpers, tries the
//! configured models in order, and validates whatever JSON comes back. The
//! model is never trusted: lines with unknown keys, units or non-positive
//! quantities are dropped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{BomLine, Estimate, ExpenseCategory, MaterialKey, Unit};
use thiserror::Error;

use crate::config::OpenAiConfig;

const TEXT_TIMEOUT: Duration = Duration::from_secs(60);
const DOCUMENT_TIMEOUT: Duration = Duration::from_secs(90);
const DEFAULT_FALLBACKS: [&str; 2] = ["gpt-4o-mini", "gpt-4o"];

#[derive(Debug, Error)]
pub enum AiError {
    #[error("OPENAI_API_KEY is not set")]
    NotConfigured,

    #[error("no model candidates available")]
    NoModels,

    #[error("request to {model} failed: {source}")]
    Http {
        model: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{model} returned {status}: {body}")]
    Api {
        model: String,
        status: u16,
        body: String,
    },

    #[error("model returned no content")]
    EmptyResponse,

    #[error("model returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("could not read {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A bill of materials proposed by the model
#[derive(Debug, Clone, Default, Serialize)]
pub struct BomProposal {
    pub lines: Vec<BomLine>,
    pub notes: String,
}

/// A purchase line suggested for staff review
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftPurchaseLine {
    pub description: String,
    pub unit: Unit,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_key: Option<MaterialKey>,
}

/// A supplier invoice suggested for staff review
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseDraft {
    pub supplier_name: Option<String>,
    pub invoice_date: Option<String>,
    pub invoice_number: Option<String>,
    pub currency: String,
    pub lines: Vec<DraftPurchaseLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
}

impl Default for PurchaseDraft {
    fn default() -> Self {
        Self {
            supplier_name: None,
            invoice_date: None,
            invoice_number: None,
            currency: "TTD".to_string(),
            lines: Vec::new(),
            tax: None,
            total: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftExpense {
    pub category: ExpenseCategory,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpenseDraft {
    pub date: Option<String>,
    pub expenses: Vec<DraftExpense>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Primary model first, then fallbacks, without duplicates
pub fn model_sequence(primary: &str, fallbacks: Option<&str>) -> Vec<String> {
    let candidates: Vec<&str> = match fallbacks.map(str::trim).filter(|f| !f.is_empty()) {
        Some(list) => list.split(',').map(str::trim).collect(),
        None => DEFAULT_FALLBACKS.to_vec(),
    };
    let mut sequence: Vec<String> = Vec::new();
    for model in std::iter::once(primary.trim()).chain(candidates) {
        if !model.is_empty() && !sequence.iter().any(|m| m == model) {
            sequence.push(model.to_string());
        }
    }
    sequence
}

/// MIME type for an uploaded document, by extension
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Message content part for an image or PDF, inlined as a data URL
pub fn content_part(path: &Path, bytes: &[u8]) -> Value {
    let mime = mime_for(path);
    let data_url = format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    );
    if mime == "application/pdf" {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf");
        json!({"type": "file", "file": {"filename": filename, "file_data": data_url}})
    } else {
        json!({"type": "image_url", "image_url": {"url": data_url}})
    }
}

fn as_f64(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn as_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Keep BOM lines with an allow-listed key, a positive quantity and an
/// estimator unit
pub fn validate_bom_lines(raw: Option<&Value>) -> Vec<BomLine> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let key = item.get("key")?.as_str()?.parse::<MaterialKey>().ok()?;
            let qty = as_f64(item.get("qty")).filter(|q| *q > 0.0)?;
            let unit = Unit::parse_estimate(item.get("unit")?.as_str()?)?;
            Some(BomLine { key, qty, unit })
        })
        .collect()
}

/// Keep purchase lines with a description, a staff unit and a positive
/// quantity. Numbers are rounded to 4 places and a missing line total is
/// computed from the unit price.
pub fn validate_purchase_lines(raw: Option<&Value>) -> Vec<DraftPurchaseLine> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let description = as_text(item.get("description"))?;
            let unit = Unit::parse_staff(item.get("unit")?.as_str()?)?;
            let qty = as_f64(item.get("qty")).filter(|q| *q > 0.0)?;
            let unit_price = as_f64(item.get("unit_price"));
            let line_total = as_f64(item.get("line_total")).or(unit_price.map(|p| p * qty));
            Some(DraftPurchaseLine {
                description,
                unit,
                qty: round_to(qty, 4),
                unit_price: unit_price.map(|p| round_to(p, 4)),
                line_total: line_total.map(|t| round_to(t, 4)),
                material_key: item
                    .get("material_key")
                    .and_then(Value::as_str)
                    .and_then(|k| k.parse().ok()),
            })
        })
        .collect()
}

/// Keep expenses with a category and a positive amount, rounded to cents
pub fn validate_expenses(raw: Option<&Value>) -> Vec<DraftExpense> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let category = as_text(item.get("category"))?;
            let amount = as_f64(item.get("amount")).filter(|a| *a > 0.0)?;
            Some(DraftExpense {
                category: ExpenseCategory::parse_lenient(&category),
                description: as_text(item.get("description")).unwrap_or_default(),
                amount: round_to(amount, 2),
            })
        })
        .collect()
}

fn purchase_draft_from(data: &Value) -> PurchaseDraft {
    PurchaseDraft {
        supplier_name: as_text(data.get("supplier_name")),
        invoice_date: as_text(data.get("invoice_date")),
        invoice_number: as_text(data.get("invoice_number")),
        currency: as_text(data.get("currency")).unwrap_or_else(|| "TTD".to_string()),
        lines: validate_purchase_lines(data.get("lines")),
        tax: as_f64(data.get("tax")),
        total: as_f64(data.get("total")),
    }
}

fn expense_draft_from(data: &Value) -> ExpenseDraft {
    ExpenseDraft {
        date: as_text(data.get("date")),
        expenses: validate_expenses(data.get("expenses")),
    }
}

fn bom_from(data: &Value) -> BomProposal {
    BomProposal {
        lines: validate_bom_lines(data.get("lines")),
        notes: as_text(data.get("notes")).unwrap_or_default(),
    }
}

fn allowed_keys() -> String {
    MaterialKey::ALL
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

const BOM_SYSTEM_PROMPT: &str = "You are a building-materials estimator for Trinidad & Tobago.\n\
Return ONLY a JSON object with keys 'lines' and 'notes'.\n\
'lines' is a list of items, each with:\n\
  - key: must be one of the allowed inventory keys I provide.\n\
  - qty: a positive number.\n\
  - unit: one of m3, m, kg, bag, sheet, pcs, gal, lb (use these EXACT tokens).\n\
If the project is a slab/driveway/pad, include reinforcement: \
'mesh_A142_sheet' (typ. one layer) or a rebar grid using 'rebar_corr_3_8_m'.\n\
Use units that match the key (e.g. *_m3 uses m3; rebar_*_m uses m; cement_bag uses bag).";

const BOM_EXAMPLE: &str = r#"Respond as pure JSON. Example shape:
{
  "lines": [
    {"key":"sharp_sand_m3","qty":2.4,"unit":"m3"},
    {"key":"gravel_m3","qty":4.8,"unit":"m3"},
    {"key":"cement_bag","qty":18,"unit":"bag"},
    {"key":"mesh_A142_sheet","qty":3,"unit":"sheet"}
  ],
  "notes":"Short rationale and assumptions."
}"#;

const ADVISOR_SYSTEM_PROMPT: &str = "You are a helpful building advisor in Trinidad & Tobago. \
Write a short, practical plan using clear bullet points. \
Use metric primarily, but acknowledge local steel sizes (3/8, 1/2, 5/8) and brands (e.g., TCL cement). \
Keep it concise and actionable for a homeowner.";

const PURCHASE_SCHEMA: &str = "Return ONLY a JSON object with keys: supplier_name?, invoice_date?, \
invoice_number?, currency?, lines, tax?, total?.\n\
lines is a list of items with fields: description (string), unit (one of yd3, m3, bag, kg, pcs, \
sheet, gal, lb), qty (number>0), unit_price (optional number>=0), line_total (optional number>=0), \
material_key (optional, one of the allowed inventory keys).\n\
Prefer unit=yd3 for aggregates like sand or gravel if quantities in yards.";

const EXPENSE_SCHEMA: &str = "Return ONLY a JSON object with optional 'date' (YYYY-MM-DD) and \
'expenses' list. Each expense has: category (salaries|fuel|maintenance|other), description \
(string), amount (number>0).";

/// OpenAI client shared by the estimator and ERP drafting endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: Option<String>,
    base_url: String,
    models: Vec<String>,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            http_client: Client::new(),
            api_key: config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            models: model_sequence(&config.model, config.fallbacks.as_deref()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Run one chat completion, trying each model in turn. The last error is
    /// returned when every model fails.
    async fn complete(
        &self,
        messages: Value,
        json_mode: bool,
        timeout: Duration,
    ) -> Result<String, AiError> {
        let api_key = self.api_key.as_deref().ok_or(AiError::NotConfigured)?;
        let url = format!("{}/chat/completions", self.base_url);
        let mut last_error = AiError::NoModels;

        for model in &self.models {
            let mut body = json!({"model": model, "messages": messages});
            if json_mode {
                body["response_format"] = json!({"type": "json_object"});
            }

            match self.send(&url, api_key, model, &body, timeout).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model, e);
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn send(
        &self,
        url: &str,
        api_key: &str,
        model: &str,
        body: &Value,
        timeout: Duration,
    ) -> Result<String, AiError> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|source| AiError::Http {
                model: model.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AiError::Api {
                model: model.to_string(),
                status,
                body: body.chars().take(400).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|source| AiError::Http {
            model: model.to_string(),
            source,
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(AiError::EmptyResponse)
    }

    async fn complete_json(
        &self,
        messages: Value,
        timeout: Duration,
    ) -> Result<Value, AiError> {
        let content = self.complete(messages, true, timeout).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn document_parts(&self, files: &[PathBuf]) -> Result<Vec<Value>, AiError> {
        let mut parts = Vec::with_capacity(files.len());
        for path in files {
            let bytes = tokio::fs::read(path).await.map_err(|source| AiError::File {
                path: path.clone(),
                source,
            })?;
            parts.push(content_part(path, &bytes));
        }
        Ok(parts)
    }

    /// Propose a bill of materials for a project description
    pub async fn propose_bom(&self, prompt: &str, spec: &Value) -> Result<BomProposal, AiError> {
        let user = format!(
            "User request: {}\n\nParsed spec (optional): {}\n\nAllowed keys ONLY: {}\n\n{}",
            prompt,
            spec,
            allowed_keys(),
            BOM_EXAMPLE
        );
        let data = self
            .complete_json(
                json!([
                    {"role": "system", "content": BOM_SYSTEM_PROMPT},
                    {"role": "user", "content": user},
                ]),
                TEXT_TIMEOUT,
            )
            .await?;
        Ok(bom_from(&data))
    }

    /// Propose a bill of materials from drawings, photos or PDFs
    pub async fn propose_bom_from_files(
        &self,
        files: &[PathBuf],
        spec: &Value,
    ) -> Result<BomProposal, AiError> {
        let mut content = vec![
            json!({"type": "text", "text": format!(
                "Parsed spec (optional): {}\n\nAllowed keys ONLY: {}\n\n{}",
                spec,
                allowed_keys(),
                BOM_EXAMPLE
            )}),
            json!({"type": "text", "text": "Extract a building bill of materials (BOM) mapped to the \
                provided allowed keys. Return ONLY JSON with keys 'lines' and 'notes'. Units must be \
                one of: m3, m, kg, bag, sheet, pcs, gal, lb."}),
        ];
        content.extend(self.document_parts(files).await?);

        let data = self
            .complete_json(
                json!([
                    {"role": "system", "content": BOM_SYSTEM_PROMPT},
                    {"role": "user", "content": content},
                ]),
                TEXT_TIMEOUT,
            )
            .await?;
        Ok(bom_from(&data))
    }

    /// Short step-by-step plan for a priced estimate. Any failure yields
    /// `default_text`.
    pub async fn expand_steps(
        &self,
        prompt: &str,
        spec: &Value,
        estimate: &Estimate,
        default_text: &str,
    ) -> String {
        let lines = serde_json::to_string(&estimate.lines).unwrap_or_else(|_| "[]".to_string());
        let user = format!(
            "Request: {}\n\nParsed spec (optional): {}\n\nEstimate lines: {}\nEstimated total: {}\n\n\
             Give a brief step-by-step plan and a few tips. Avoid brand promotions; keep it neutral and practical.",
            prompt, spec, lines, estimate.total
        );
        let messages = json!([
            {"role": "system", "content": ADVISOR_SYSTEM_PROMPT},
            {"role": "user", "content": user},
        ]);
        match self.complete(messages, false, TEXT_TIMEOUT).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Estimate narrative failed: {}", e);
                default_text.to_string()
            }
        }
    }

    /// Draft a purchase invoice from free text
    pub async fn propose_purchase(&self, text: &str) -> Result<PurchaseDraft, AiError> {
        let system = format!(
            "You are a helpful assistant for staff purchase entry. {}\nAllowed keys: {}",
            PURCHASE_SCHEMA,
            allowed_keys()
        );
        let data = self
            .complete_json(
                json!([
                    {"role": "system", "content": system},
                    {"role": "user", "content": text.trim()},
                ]),
                TEXT_TIMEOUT,
            )
            .await?;
        Ok(purchase_draft_from(&data))
    }

    /// Draft a purchase invoice from scanned supplier invoices
    pub async fn propose_invoice_from_files(
        &self,
        files: &[PathBuf],
    ) -> Result<PurchaseDraft, AiError> {
        let mut content = vec![json!({"type": "text", "text": format!(
            "Extract supplier invoice data. {}\nAllowed keys: {}",
            PURCHASE_SCHEMA,
            allowed_keys()
        )})];
        content.extend(self.document_parts(files).await?);

        let data = self
            .complete_json(
                json!([
                    {"role": "system", "content": "You read supplier invoices for building materials. \
                        Use yd3 for cubic yards when appropriate. Respond strictly as JSON per instructions."},
                    {"role": "user", "content": content},
                ]),
                DOCUMENT_TIMEOUT,
            )
            .await?;
        Ok(purchase_draft_from(&data))
    }

    /// Draft expense entries from free text
    pub async fn propose_expenses(&self, text: &str) -> Result<ExpenseDraft, AiError> {
        let data = self
            .complete_json(
                json!([
                    {"role": "system", "content": format!(
                        "You help staff record operating expenses. {}", EXPENSE_SCHEMA
                    )},
                    {"role": "user", "content": text.trim()},
                ]),
                TEXT_TIMEOUT,
            )
            .await?;
        Ok(expense_draft_from(&data))
    }

    /// Draft expense entries from receipts
    pub async fn propose_expenses_from_files(
        &self,
        files: &[PathBuf],
    ) -> Result<ExpenseDraft, AiError> {
        let mut content = vec![json!({"type": "text", "text": format!(
            "Extract operating expenses from these receipts. {}", EXPENSE_SCHEMA
        )})];
        content.extend(self.document_parts(files).await?);

        let data = self
            .complete_json(
                json!([
                    {"role": "system", "content": "You read receipts for a building-materials business. \
                        Respond strictly as JSON per instructions."},
                    {"role": "user", "content": content},
                ]),
                DOCUMENT_TIMEOUT,
            )
            .await?;
        Ok(expense_draft_from(&data))
    }
}
