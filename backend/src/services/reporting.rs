//! Purchase, sales and gross profit reports
//!
//! Everything is reconciled to cubic yards. Cost of goods sold uses the
//! weighted average purchase cost per material over the report range, plus
//! packaging for aggregates sold by the bag. Lines whose unit carries no
//! volume still count toward revenue and purchase cost, but never toward
//! quantities or COGS.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use shared::{line_aggregate, material_label, to_cubic_yards, DateRange, Unit};

use crate::config::ReportingConfig;
use crate::error::{AppError, AppResult};
use crate::services::ExpenseService;

/// Conversion constants for a report run
#[derive(Debug, Clone, Copy)]
pub struct ReportParams {
    pub bags_per_yd3: Decimal,
    pub bag_cost: Decimal,
}

impl ReportParams {
    /// Packaging cost carried by one cubic yard sold in bags
    pub fn packaging_per_yd3(&self) -> Decimal {
        self.bag_cost * self.bags_per_yd3
    }
}

impl From<&ReportingConfig> for ReportParams {
    fn from(config: &ReportingConfig) -> Self {
        Self {
            bags_per_yd3: config.bags_per_yd3,
            bag_cost: config.bag_cost,
        }
    }
}

/// A purchase or sales line with its counterparty
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    /// Supplier for purchases, customer for sales
    pub party: String,
    pub material_key: Option<String>,
    pub description: String,
    pub unit: Unit,
    pub qty: Decimal,
    pub line_total: Option<Decimal>,
}

impl ReportLine {
    pub fn label(&self) -> String {
        material_label(self.material_key.as_deref(), &self.description)
    }

    /// Volume in cubic yards, or `None` when the unit carries no volume
    pub fn volume(&self, params: &ReportParams) -> Option<Decimal> {
        let aggregate = line_aggregate(self.material_key.as_deref(), &self.description);
        to_cubic_yards(self.qty, self.unit, aggregate, params.bags_per_yd3)
    }

    fn amount(&self) -> Decimal {
        self.line_total.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseReportRow {
    pub material: String,
    pub supplier: String,
    pub qty_yd3: Decimal,
    pub cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReportRow {
    pub product: String,
    pub qty_yd3: Decimal,
    pub revenue: Decimal,
    pub avg_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrossProfitRow {
    pub product: String,
    pub qty_yd3: Decimal,
    pub revenue: Decimal,
    pub avg_cost_yd3: Decimal,
    pub cogs: Decimal,
    pub gp: Decimal,
    pub margin_pct: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrossProfitReport {
    pub rows: Vec<GrossProfitRow>,
    pub total: GrossProfitRow,
    pub opex: Decimal,
    pub net_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerReportRow {
    pub customer: String,
    pub revenue: Decimal,
    pub cogs: Decimal,
    pub gp: Decimal,
    pub margin_pct: Decimal,
}

fn money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

fn volume_qty(value: Decimal) -> Decimal {
    value.round_dp(4)
}

/// `gp / revenue * 100`, or 0 without revenue
pub fn margin_pct(gp: Decimal, revenue: Decimal) -> Decimal {
    if revenue.is_zero() {
        Decimal::ZERO
    } else {
        money(gp / revenue * Decimal::ONE_HUNDRED)
    }
}

/// Weighted average cost per cubic yard for each material. Only lines that
/// carry volume contribute cost; a material with no volume averages 0.
pub fn weighted_average_costs(
    purchases: &[ReportLine],
    params: &ReportParams,
) -> BTreeMap<String, Decimal> {
    let mut sums: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for line in purchases {
        let Some(volume) = line.volume(params) else {
            continue;
        };
        let entry = sums.entry(line.label()).or_default();
        entry.0 += line.amount();
        entry.1 += volume;
    }
    sums.into_iter()
        .map(|(label, (cost, volume))| {
            let avg = if volume.is_zero() { Decimal::ZERO } else { cost / volume };
            (label, avg)
        })
        .collect()
}

/// Cost of goods for one sales line: volume at average cost, plus packaging
/// when sold in bags
fn line_cogs(
    line: &ReportLine,
    avg_costs: &BTreeMap<String, Decimal>,
    params: &ReportParams,
) -> Decimal {
    let Some(volume) = line.volume(params) else {
        return Decimal::ZERO;
    };
    let avg = avg_costs.get(&line.label()).copied().unwrap_or(Decimal::ZERO);
    let packaging = if line.unit == Unit::Bag {
        volume * params.packaging_per_yd3()
    } else {
        Decimal::ZERO
    };
    volume * avg + packaging
}

pub fn purchases_report(purchases: &[ReportLine], params: &ReportParams) -> Vec<PurchaseReportRow> {
    let mut groups: BTreeMap<(String, String), (Decimal, Decimal)> = BTreeMap::new();
    for line in purchases {
        let entry = groups.entry((line.label(), line.party.clone())).or_default();
        entry.0 += line.volume(params).unwrap_or(Decimal::ZERO);
        entry.1 += line.amount();
    }
    groups
        .into_iter()
        .map(|((material, supplier), (qty, cost))| PurchaseReportRow {
            material,
            supplier,
            qty_yd3: volume_qty(qty),
            cost: money(cost),
        })
        .collect()
}

pub fn sales_report(sales: &[ReportLine], params: &ReportParams) -> Vec<SalesReportRow> {
    let mut groups: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for line in sales {
        let entry = groups.entry(line.label()).or_default();
        entry.0 += line.volume(params).unwrap_or(Decimal::ZERO);
        entry.1 += line.amount();
    }
    groups
        .into_iter()
        .map(|(product, (qty, revenue))| SalesReportRow {
            product,
            qty_yd3: volume_qty(qty),
            avg_price: if qty.is_zero() { Decimal::ZERO } else { money(revenue / qty) },
            revenue: money(revenue),
        })
        .collect()
}

pub fn gross_profit_report(
    purchases: &[ReportLine],
    sales: &[ReportLine],
    opex: Decimal,
    params: &ReportParams,
) -> GrossProfitReport {
    let avg_costs = weighted_average_costs(purchases, params);

    let mut groups: BTreeMap<String, (Decimal, Decimal, Decimal)> = BTreeMap::new();
    for line in sales {
        let entry = groups.entry(line.label()).or_default();
        entry.0 += line.volume(params).unwrap_or(Decimal::ZERO);
        entry.1 += line.amount();
        entry.2 += line_cogs(line, &avg_costs, params);
    }

    let (mut total_qty, mut total_revenue, mut total_cogs) =
        (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
    let rows: Vec<GrossProfitRow> = groups
        .into_iter()
        .map(|(product, (qty, revenue, cogs))| {
            total_qty += qty;
            total_revenue += revenue;
            total_cogs += cogs;
            let gp = revenue - cogs;
            GrossProfitRow {
                avg_cost_yd3: money(avg_costs.get(&product).copied().unwrap_or(Decimal::ZERO)),
                product,
                qty_yd3: volume_qty(qty),
                revenue: money(revenue),
                cogs: money(cogs),
                gp: money(gp),
                margin_pct: margin_pct(gp, revenue),
            }
        })
        .collect();

    let total_gp = total_revenue - total_cogs;
    GrossProfitReport {
        rows,
        total: GrossProfitRow {
            product: "TOTAL".to_string(),
            qty_yd3: volume_qty(total_qty),
            revenue: money(total_revenue),
            avg_cost_yd3: Decimal::ZERO,
            cogs: money(total_cogs),
            gp: money(total_gp),
            margin_pct: margin_pct(total_gp, total_revenue),
        },
        opex: money(opex),
        net_profit: money(total_gp - opex),
    }
}

pub fn customers_report(
    purchases: &[ReportLine],
    sales: &[ReportLine],
    params: &ReportParams,
) -> Vec<CustomerReportRow> {
    let avg_costs = weighted_average_costs(purchases, params);
    let mut groups: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for line in sales {
        let entry = groups.entry(line.party.clone()).or_default();
        entry.0 += line.amount();
        entry.1 += line_cogs(line, &avg_costs, params);
    }
    groups
        .into_iter()
        .map(|(customer, (revenue, cogs))| {
            let gp = revenue - cogs;
            CustomerReportRow {
                customer,
                revenue: money(revenue),
                cogs: money(cogs),
                gp: money(gp),
                margin_pct: margin_pct(gp, revenue),
            }
        })
        .collect()
}

/// Export rows to CSV with a header taken from the field names
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    finish_csv(wtr)
}

/// Gross profit CSV: product rows, then TOTAL, OPEX and NET_PROFIT. The
/// OPEX and NET_PROFIT amounts sit in the `gp` column.
pub fn gross_profit_csv(report: &GrossProfitReport) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let csv_err = |e: csv::Error| AppError::Internal(format!("CSV serialization error: {}", e));

    wtr.write_record([
        "product",
        "qty_yd3",
        "revenue",
        "avg_cost_yd3",
        "cogs",
        "gp",
        "margin_pct",
    ])
    .map_err(csv_err)?;
    for row in report.rows.iter().chain(std::iter::once(&report.total)) {
        wtr.write_record([
            row.product.clone(),
            row.qty_yd3.to_string(),
            row.revenue.to_string(),
            row.avg_cost_yd3.to_string(),
            row.cogs.to_string(),
            row.gp.to_string(),
            row.margin_pct.to_string(),
        ])
        .map_err(csv_err)?;
    }
    for (label, amount) in [("OPEX", report.opex), ("NET_PROFIT", report.net_profit)] {
        wtr.write_record([label, "", "", "", "", &amount.to_string(), ""])
            .map_err(csv_err)?;
    }
    finish_csv(wtr)
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> AppResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

#[derive(Debug, FromRow)]
struct ReportLineRow {
    party: String,
    material_key: Option<String>,
    description: String,
    unit: String,
    qty: Decimal,
    line_total: Option<Decimal>,
}

fn into_report_lines(rows: Vec<ReportLineRow>) -> Vec<ReportLine> {
    rows.into_iter()
        .filter_map(|row| {
            let Some(unit) = Unit::parse_staff(&row.unit) else {
                tracing::warn!("Skipping report line with unknown unit '{}'", row.unit);
                return None;
            };
            Some(ReportLine {
                party: row.party,
                material_key: row.material_key,
                description: row.description,
                unit,
                qty: row.qty,
                line_total: row.line_total,
            })
        })
        .collect()
}

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
    params: ReportParams,
}

impl ReportingService {
    pub fn new(db: PgPool, config: &ReportingConfig) -> Self {
        Self {
            db,
            params: config.into(),
        }
    }

    async fn purchase_lines(&self, range: DateRange) -> AppResult<Vec<ReportLine>> {
        let rows = sqlx::query_as::<_, ReportLineRow>(
            r#"
            SELECT s.name AS party, l.material_key, l.description, l.unit, l.qty, l.line_total
            FROM purchase_line_items l
            JOIN purchase_invoices i ON i.id = l.invoice_id
            JOIN suppliers s ON s.id = i.supplier_id
            WHERE i.invoice_date BETWEEN $1 AND $2
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;
        Ok(into_report_lines(rows))
    }

    async fn sales_lines(&self, range: DateRange) -> AppResult<Vec<ReportLine>> {
        let rows = sqlx::query_as::<_, ReportLineRow>(
            r#"
            SELECT r.customer_name AS party, l.material_key, l.description, l.unit, l.qty, l.line_total
            FROM sales_receipt_lines l
            JOIN sales_receipts r ON r.id = l.receipt_id
            WHERE r.receipt_date BETWEEN $1 AND $2
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;
        Ok(into_report_lines(rows))
    }

    pub async fn purchases(&self, range: DateRange) -> AppResult<Vec<PurchaseReportRow>> {
        let lines = self.purchase_lines(range).await?;
        Ok(purchases_report(&lines, &self.params))
    }

    pub async fn sales(&self, range: DateRange) -> AppResult<Vec<SalesReportRow>> {
        let lines = self.sales_lines(range).await?;
        Ok(sales_report(&lines, &self.params))
    }

    pub async fn gross_profit(&self, range: DateRange) -> AppResult<GrossProfitReport> {
        let purchases = self.purchase_lines(range).await?;
        let sales = self.sales_lines(range).await?;
        let opex = ExpenseService::new(self.db.clone())
            .total_in_range(range)
            .await?;
        Ok(gross_profit_report(&purchases, &sales, opex, &self.params))
    }

    pub async fn customers(&self, range: DateRange) -> AppResult<Vec<CustomerReportRow>> {
        let purchases = self.purchase_lines(range).await?;
        let sales = self.sales_lines(range).await?;
        Ok(customers_report(&purchases, &sales, &self.params))
    }
}
