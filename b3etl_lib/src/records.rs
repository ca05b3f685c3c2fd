//! Record types handed between pipeline stages.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use b3_api::types::{Constituent, PortfolioHeader};

use crate::error::EtlError;
use crate::numeric::{parse_locale_number, parse_optional};

/// Portfolio-wide metadata taken from the first page's header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderMeta {
    /// Reference date as sent by the API (`dd/mm/yy`).
    pub data_date: Option<String>,
    pub total_theoretical_qty: Option<f64>,
    pub reductor: Option<f64>,
}

impl From<&PortfolioHeader> for HeaderMeta {
    fn from(header: &PortfolioHeader) -> Self {
        Self {
            data_date: header.date.clone(),
            total_theoretical_qty: parse_optional("theoricalQty", header.theorical_qty.as_deref()),
            reductor: parse_optional("reductor", header.reductor.as_deref()),
        }
    }
}

/// One index constituent on a given trading day, with numeric fields
/// normalized and extraction metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub segment: Option<String>,
    pub cod: String,
    pub asset: String,
    #[serde(rename = "type")]
    pub share_type: String,
    /// Percentage weight in the index.
    pub part: f64,
    #[serde(rename = "partAcum")]
    pub part_acum: Option<String>,
    #[serde(rename = "theoricalQty")]
    pub theoretical_qty: f64,
    pub extraction_date: NaiveDate,
    pub extraction_timestamp: NaiveDateTime,
    pub data_date: Option<String>,
    pub total_theoretical_qty: Option<f64>,
    pub reductor: Option<f64>,
}

impl RawRecord {
    /// Normalizes one wire constituent. Fails on a malformed `part` or
    /// `theoricalQty`; string fields are trimmed.
    pub fn from_constituent(
        c: &Constituent,
        header: &HeaderMeta,
        extracted_at: NaiveDateTime,
    ) -> Result<Self, EtlError> {
        let part = parse_locale_number("part", &c.part)?;
        let theoretical_qty = parse_locale_number("theoricalQty", &c.theorical_qty)?;
        Ok(Self {
            segment: c
                .segment
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            cod: c.cod.trim().to_string(),
            asset: c.asset.trim().to_string(),
            share_type: c.share_type.trim().to_string(),
            part,
            part_acum: c.part_acum.clone(),
            theoretical_qty,
            extraction_date: extracted_at.date(),
            extraction_timestamp: extracted_at,
            data_date: header.data_date.clone(),
            total_theoretical_qty: header.total_theoretical_qty,
            reductor: header.reductor,
        })
    }
}

/// One row per distinct asset after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub acao: String,
    pub qtd_codigo: i64,
    pub participacao: f64,
    pub qtd_teorica_total: i64,
    /// Processing date, `YYYY-MM-DD`.
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constituent(part: &str, qty: &str) -> Constituent {
        Constituent {
            segment: Some("  ".to_string()),
            cod: " ALOS3 ".to_string(),
            asset: "ALLOS ".to_string(),
            share_type: "ON      NM".to_string(),
            part: part.to_string(),
            part_acum: None,
            theorical_qty: qty.to_string(),
        }
    }

    fn extracted_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 17)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn normalizes_constituent() {
        let header = HeaderMeta {
            data_date: Some("17/10/25".to_string()),
            total_theoretical_qty: Some(95029281398.0),
            reductor: None,
        };
        let rec =
            RawRecord::from_constituent(&constituent("0,490", "476.976.044"), &header, extracted_at())
                .unwrap();
        assert_eq!(rec.cod, "ALOS3");
        assert_eq!(rec.asset, "ALLOS");
        assert_eq!(rec.share_type, "ON      NM");
        assert_eq!(rec.segment, None);
        assert!((rec.part - 0.49).abs() < 1e-12);
        assert_eq!(rec.theoretical_qty, 476976044.0);
        assert_eq!(rec.extraction_date, NaiveDate::from_ymd_opt(2025, 10, 17).unwrap());
        assert_eq!(rec.data_date.as_deref(), Some("17/10/25"));
        assert_eq!(rec.total_theoretical_qty, Some(95029281398.0));
    }

    #[test]
    fn malformed_part_fails() {
        let err = RawRecord::from_constituent(
            &constituent("N/A", "1"),
            &HeaderMeta::default(),
            extracted_at(),
        )
        .unwrap_err();
        assert!(matches!(err, EtlError::MalformedNumericField { field: "part", .. }));
    }

    #[test]
    fn header_meta_from_wire() {
        let header = PortfolioHeader {
            date: Some("17/10/25".to_string()),
            reductor: Some("16.683.713,71215846".to_string()),
            theorical_qty: Some("95.029.281.398".to_string()),
            ..PortfolioHeader::default()
        };
        let meta = HeaderMeta::from(&header);
        assert_eq!(meta.total_theoretical_qty, Some(95029281398.0));
        assert!((meta.reductor.unwrap() - 16683713.71215846).abs() < 1e-6);
    }
}
