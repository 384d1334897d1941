//! Reporting tests
//!
//! Unit and property-based tests for the cubic-yard reports:
//! - purchases grouped by material and supplier
//! - sales with average price per yard
//! - gross profit at weighted average cost, with bag packaging and OPEX
//! - per-customer profitability

use std::str::FromStr;

use conserv_backend::services::reporting::{
    customers_report, gross_profit_csv, gross_profit_report, margin_pct, purchases_report,
    sales_report, weighted_average_costs, ReportLine, ReportParams,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{to_cubic_yards, Aggregate, Unit};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn params() -> ReportParams {
    ReportParams {
        bags_per_yd3: dec("20"),
        bag_cost: dec("1.50"),
    }
}

fn line(party: &str, key: Option<&str>, description: &str, unit: Unit, qty: &str, total: &str) -> ReportLine {
    ReportLine {
        party: party.to_string(),
        material_key: key.map(String::from),
        description: description.to_string(),
        unit,
        qty: dec(qty),
        line_total: Some(dec(total)),
    }
}

fn purchases() -> Vec<ReportLine> {
    vec![
        line("Alpha Quarry", Some("sand_m3"), "Plaster sand", Unit::Yd3, "10", "3000"),
        line("Beta Pits", Some("sand_m3"), "Plaster sand", Unit::Yd3, "10", "2000"),
        line("Alpha Quarry", Some("cement_bag"), "Cement 42.5kg", Unit::Bag, "100", "8500"),
    ]
}

fn sales() -> Vec<ReportLine> {
    vec![
        line("Xavier", None, "Sand", Unit::Yd3, "2", "800"),
        line("Yolanda", None, "Sand", Unit::Bag, "40", "1000"),
        line("Xavier", Some("cement_bag"), "Cement", Unit::Bag, "10", "950"),
    ]
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_purchases_report_groups_by_material_and_supplier() {
        let rows = purchases_report(&purchases(), &params());
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].material, "cement_bag");
        assert_eq!(rows[0].qty_yd3, Decimal::ZERO);
        assert_eq!(rows[0].cost, dec("8500"));

        assert_eq!(rows[1].material, "sand");
        assert_eq!(rows[1].supplier, "Alpha Quarry");
        assert_eq!(rows[1].qty_yd3, dec("10"));
        assert_eq!(rows[2].supplier, "Beta Pits");
        assert_eq!(rows[2].cost, dec("2000"));
    }

    #[test]
    fn test_weighted_average_ignores_lines_without_volume() {
        let costs = weighted_average_costs(&purchases(), &params());
        assert_eq!(costs.get("sand"), Some(&dec("250")));
        assert!(!costs.contains_key("cement_bag"));
    }

    #[test]
    fn test_sales_report() {
        let rows = sales_report(&sales(), &params());
        let sand = rows.iter().find(|r| r.product == "sand").unwrap();
        // 2 yd3 loose + 40 bags at 20 bags per yard
        assert_eq!(sand.qty_yd3, dec("4"));
        assert_eq!(sand.revenue, dec("1800"));
        assert_eq!(sand.avg_price, dec("450"));

        let cement = rows.iter().find(|r| r.product == "cement_bag").unwrap();
        assert_eq!(cement.qty_yd3, Decimal::ZERO);
        assert_eq!(cement.avg_price, Decimal::ZERO);
    }

    #[test]
    fn test_gross_profit_with_packaging_and_opex() {
        let report = gross_profit_report(&purchases(), &sales(), dec("200"), &params());

        let sand = report.rows.iter().find(|r| r.product == "sand").unwrap();
        // 4 yd3 at 250, plus 2 bagged yards at 20 bags * 1.50
        assert_eq!(sand.avg_cost_yd3, dec("250"));
        assert_eq!(sand.cogs, dec("1060"));
        assert_eq!(sand.gp, dec("740"));
        assert_eq!(sand.margin_pct, dec("41.11"));

        let cement = report.rows.iter().find(|r| r.product == "cement_bag").unwrap();
        assert_eq!(cement.cogs, Decimal::ZERO);
        assert_eq!(cement.margin_pct, dec("100"));

        assert_eq!(report.total.product, "TOTAL");
        assert_eq!(report.total.revenue, dec("2750"));
        assert_eq!(report.total.cogs, dec("1060"));
        assert_eq!(report.total.gp, dec("1690"));
        assert_eq!(report.total.margin_pct, dec("61.45"));
        assert_eq!(report.opex, dec("200"));
        assert_eq!(report.net_profit, dec("1490"));
    }

    #[test]
    fn test_gross_profit_without_purchases_costs_nothing() {
        let report = gross_profit_report(&[], &sales(), Decimal::ZERO, &params());
        let sand = report.rows.iter().find(|r| r.product == "sand").unwrap();
        // only packaging remains
        assert_eq!(sand.cogs, dec("60"));
        assert_eq!(sand.avg_cost_yd3, Decimal::ZERO);
    }

    #[test]
    fn test_keyed_cement_is_never_an_aggregate() {
        let sales = vec![line("Xavier", Some("cement_bag"), "Cement for sand mix", Unit::Bag, "10", "950")];
        let report = gross_profit_report(&purchases(), &sales, Decimal::ZERO, &params());

        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.product, "cement_bag");
        assert_eq!(row.qty_yd3, Decimal::ZERO);
        assert_eq!(row.cogs, Decimal::ZERO);
        assert_eq!(row.gp, dec("950"));
    }

    #[test]
    fn test_customers_report() {
        let rows = customers_report(&purchases(), &sales(), &params());
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].customer, "Xavier");
        assert_eq!(rows[0].revenue, dec("1750"));
        assert_eq!(rows[0].cogs, dec("500"));
        assert_eq!(rows[0].margin_pct, dec("71.43"));

        assert_eq!(rows[1].customer, "Yolanda");
        assert_eq!(rows[1].cogs, dec("560"));
        assert_eq!(rows[1].gp, dec("440"));
        assert_eq!(rows[1].margin_pct, dec("44"));
    }

    #[test]
    fn test_gross_profit_csv_layout() {
        let report = gross_profit_report(&purchases(), &sales(), dec("200"), &params());
        let csv = gross_profit_csv(&report).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "product,qty_yd3,revenue,avg_cost_yd3,cogs,gp,margin_pct");
        assert!(lines[lines.len() - 3].starts_with("TOTAL,"));
        for (row, label, amount) in [(lines.len() - 2, "OPEX", "200"), (lines.len() - 1, "NET_PROFIT", "1490")] {
            let fields: Vec<&str> = lines[row].split(',').collect();
            assert_eq!(fields.len(), 7);
            assert_eq!(fields[0], label);
            assert_eq!(dec(fields[5]), dec(amount));
            assert!(fields[6].is_empty());
        }
    }

    #[test]
    fn test_empty_range_gives_zero_totals() {
        let report = gross_profit_report(&[], &[], dec("75"), &params());
        assert!(report.rows.is_empty());
        assert_eq!(report.total.revenue, Decimal::ZERO);
        assert_eq!(report.total.margin_pct, Decimal::ZERO);
        assert_eq!(report.net_profit, dec("-75"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Margin is 0 whenever there is no revenue
        #[test]
        fn prop_margin_without_revenue_is_zero(gp in -1_000_000i64..1_000_000) {
            prop_assert_eq!(margin_pct(Decimal::from(gp), Decimal::ZERO), Decimal::ZERO);
        }

        /// Bags of aggregate convert at the configured rate
        #[test]
        fn prop_bags_convert_to_yards(bags in 1u32..10_000) {
            let yd3 = to_cubic_yards(Decimal::from(bags), Unit::Bag, Some(Aggregate::Gravel), dec("20")).unwrap();
            prop_assert_eq!(yd3 * dec("20"), Decimal::from(bags));
        }

        /// Report revenue equals the sum of sales line totals
        #[test]
        fn prop_total_revenue_matches_lines(cents in prop::collection::vec(0i64..1_000_000, 1..20)) {
            let lines: Vec<ReportLine> = cents
                .iter()
                .enumerate()
                .map(|(i, c)| ReportLine {
                    party: format!("customer-{}", i % 3),
                    material_key: None,
                    description: if i % 2 == 0 { "Sand".into() } else { "Gravel".into() },
                    unit: Unit::Yd3,
                    qty: Decimal::ONE,
                    line_total: Some(Decimal::new(*c, 2)),
                })
                .collect();
            let expected: Decimal = cents.iter().map(|c| Decimal::new(*c, 2)).sum();

            let report = gross_profit_report(&[], &lines, Decimal::ZERO, &params());
            prop_assert_eq!(report.total.revenue, expected);

            let by_customer: Decimal = customers_report(&[], &lines, &params())
                .iter()
                .map(|r| r.revenue)
                .sum();
            prop_assert_eq!(by_customer, expected);
        }

        /// Weighted average cost lies between the cheapest and dearest yard bought
        #[test]
        fn prop_average_cost_is_bounded(
            buys in prop::collection::vec((1u32..50, 100u32..1_000), 1..10)
        ) {
            let lines: Vec<ReportLine> = buys
                .iter()
                .map(|(qty, per_yd3)| ReportLine {
                    party: "Quarry".into(),
                    material_key: Some("gravel_m3".into()),
                    description: "Gravel".into(),
                    unit: Unit::Yd3,
                    qty: Decimal::from(*qty),
                    line_total: Some(Decimal::from(qty * per_yd3)),
                })
                .collect();
            let avg = weighted_average_costs(&lines, &params())["gravel"];
            let min = Decimal::from(buys.iter().map(|(_, p)| *p).min().unwrap());
            let max = Decimal::from(buys.iter().map(|(_, p)| *p).max().unwrap());
            prop_assert!(avg >= min && avg <= max);
        }
    }
}
