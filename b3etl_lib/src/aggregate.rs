//! Per-asset aggregation of raw constituents.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::records::{RawRecord, SummaryRecord};

/// Groups raw records by `asset` into [`SummaryRecord`]s.
///
/// Grouping uses exact string equality: assets that differ only by case or
/// internal whitespace land in separate groups. Output order is the order
/// in which each asset first appears in the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

#[derive(Default)]
struct Group {
    count: i64,
    part: f64,
    theoretical_qty: f64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregates `records`, stamping every row with `processing_date`.
    /// Empty input yields empty output.
    pub fn aggregate(&self, records: &[RawRecord], processing_date: NaiveDate) -> Vec<SummaryRecord> {
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Group> = HashMap::new();

        for rec in records {
            let group = groups.entry(rec.asset.as_str()).or_insert_with(|| {
                order.push(rec.asset.as_str());
                Group::default()
            });
            group.count += 1;
            group.part += rec.part;
            group.theoretical_qty += rec.theoretical_qty;
        }

        let data = processing_date.format("%Y-%m-%d").to_string();
        let summary: Vec<SummaryRecord> = order
            .into_iter()
            .filter_map(|asset| {
                groups.remove(asset).map(|g| SummaryRecord {
                    acao: asset.to_string(),
                    qtd_codigo: g.count,
                    participacao: g.part,
                    qtd_teorica_total: g.theoretical_qty.trunc() as i64,
                    data: data.clone(),
                })
            })
            .collect();

        debug_assert_eq!(
            summary.iter().map(|s| s.qtd_codigo).sum::<i64>(),
            records.len() as i64
        );
        tracing::info!(
            "Aggregated {} records into {} assets",
            records.len(),
            summary.len()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 17)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn raw(cod: &str, asset: &str, part: f64, qty: f64) -> RawRecord {
        RawRecord {
            segment: Some("NM".to_string()),
            cod: cod.to_string(),
            asset: asset.to_string(),
            share_type: "ON".to_string(),
            part,
            part_acum: None,
            theoretical_qty: qty,
            extraction_date: ts().date(),
            extraction_timestamp: ts(),
            data_date: Some("17/10/25".to_string()),
            total_theoretical_qty: None,
            reductor: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 19).unwrap()
    }

    #[test]
    fn sums_per_asset() {
        let input = vec![raw("ALOS3", "ALLOS", 0.49, 100.0), raw("ALOS3", "ALLOS", 0.49, 200.0)];
        let out = Aggregator::new().aggregate(&input, date());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].acao, "ALLOS");
        assert_eq!(out[0].qtd_codigo, 2);
        assert!((out[0].participacao - 0.98).abs() < 1e-12);
        assert_eq!(out[0].qtd_teorica_total, 300);
        assert_eq!(out[0].data, "2025-10-19");
    }

    #[test]
    fn first_seen_order_and_counts() {
        let input = vec![
            raw("PETR4", "PETROBRAS", 8.75, 987654.0),
            raw("ABEV3", "AMBEV S/A", 2.85, 1234567.0),
            raw("PETR3", "PETROBRAS", 1.25, 234567.0),
            raw("VALE3", "VALE", 5.5, 1876543.0),
        ];
        let out = Aggregator::new().aggregate(&input, date());
        let names: Vec<&str> = out.iter().map(|s| s.acao.as_str()).collect();
        assert_eq!(names, vec!["PETROBRAS", "AMBEV S/A", "VALE"]);
        assert_eq!(out[0].qtd_codigo, 2);
        assert_eq!(out[0].qtd_teorica_total, 1222221);
        assert_eq!(out.iter().map(|s| s.qtd_codigo).sum::<i64>(), 4);
    }

    #[test]
    fn casing_differences_stay_separate() {
        let input = vec![raw("ITUB4", "ITAU UNIBANCO", 3.0, 1.0), raw("ITUB3", "Itau Unibanco", 1.0, 1.0)];
        let out = Aggregator::new().aggregate(&input, date());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn quantity_truncated() {
        let input = vec![raw("X1", "X", 1.0, 10.6), raw("X2", "X", 1.0, 0.3)];
        let out = Aggregator::new().aggregate(&input, date());
        assert_eq!(out[0].qtd_teorica_total, 10);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(Aggregator::new().aggregate(&[], date()).is_empty());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let input = vec![
            raw("ALOS3", "ALLOS", 0.49, 476976044.0),
            raw("ABEV3", "AMBEV S/A", 2.85, 4394835131.0),
            raw("ALOS4", "ALLOS", 0.12, 1000.0),
        ];
        let agg = Aggregator::new();
        let first = serde_json::to_vec(&agg.aggregate(&input, date())).unwrap();
        let second = serde_json::to_vec(&agg.aggregate(&input, date())).unwrap();
        assert_eq!(first, second);
    }
}
