//! Columnar frames and the date-partitioned local parquet store.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::{
    Column, DataFrame, NamedFrom, ParquetReader, ParquetWriter, SerReader, Series,
};

use crate::error::EtlError;
use crate::records::{RawRecord, SummaryRecord};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The two datasets the pipeline writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Raw,
    Transformed,
}

impl Dataset {
    fn prefix(self) -> &'static str {
        match self {
            Dataset::Raw => "ibovespa-data",
            Dataset::Transformed => "ibovespa-data-transformed",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Dataset::Raw => "ibovespa",
            Dataset::Transformed => "ibovespa_transformed",
        }
    }

    /// `<prefix>/year=YYYY/month=MM/day=DD/<name>_<YYYYMMDD>.parquet`
    pub fn partition_key(self, date: NaiveDate) -> String {
        format!(
            "{}/year={}/month={:02}/day={:02}/{}_{}.parquet",
            self.prefix(),
            date.year(),
            date.month(),
            date.day(),
            self.name(),
            date.format("%Y%m%d")
        )
    }
}

fn column<T, P>(name: &str, values: T) -> Column
where
    Series: NamedFrom<T, P>,
    P: ?Sized,
{
    Column::from(Series::new(name.into(), values))
}

/// Builds the raw dataset frame, one row per record, with upstream field names.
pub fn raw_frame(records: &[RawRecord]) -> Result<DataFrame, EtlError> {
    let df = DataFrame::new(vec![
        column("segment", records.iter().map(|r| r.segment.clone()).collect::<Vec<_>>()),
        column("cod", records.iter().map(|r| r.cod.clone()).collect::<Vec<_>>()),
        column("asset", records.iter().map(|r| r.asset.clone()).collect::<Vec<_>>()),
        column("type", records.iter().map(|r| r.share_type.clone()).collect::<Vec<_>>()),
        column("part", records.iter().map(|r| r.part).collect::<Vec<_>>()),
        column("partAcum", records.iter().map(|r| r.part_acum.clone()).collect::<Vec<_>>()),
        column("theoricalQty", records.iter().map(|r| r.theoretical_qty).collect::<Vec<_>>()),
        column(
            "extraction_date",
            records
                .iter()
                .map(|r| r.extraction_date.format(DATE_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        column(
            "extraction_timestamp",
            records
                .iter()
                .map(|r| r.extraction_timestamp.format(TIMESTAMP_FORMAT).to_string())
                .collect::<Vec<_>>(),
        ),
        column("data_date", records.iter().map(|r| r.data_date.clone()).collect::<Vec<_>>()),
        column(
            "total_theoretical_qty",
            records.iter().map(|r| r.total_theoretical_qty).collect::<Vec<_>>(),
        ),
        column("reductor", records.iter().map(|r| r.reductor).collect::<Vec<_>>()),
    ])?;
    Ok(df)
}

/// Builds the transformed dataset frame.
pub fn summary_frame(rows: &[SummaryRecord]) -> Result<DataFrame, EtlError> {
    let df = DataFrame::new(vec![
        column("acao", rows.iter().map(|r| r.acao.clone()).collect::<Vec<_>>()),
        column("qtd_codigo", rows.iter().map(|r| r.qtd_codigo).collect::<Vec<_>>()),
        column("participacao", rows.iter().map(|r| r.participacao).collect::<Vec<_>>()),
        column(
            "qtd_teorica_total",
            rows.iter().map(|r| r.qtd_teorica_total).collect::<Vec<_>>(),
        ),
        column("data", rows.iter().map(|r| r.data.clone()).collect::<Vec<_>>()),
    ])?;
    Ok(df)
}

/// Reads a raw dataset frame back into records.
pub fn raw_records_from_frame(df: &DataFrame) -> Result<Vec<RawRecord>, EtlError> {
    let str_col = |name: &str| -> Result<Vec<Option<String>>, EtlError> {
        let series = df.column(name)?.as_materialized_series();
        Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect())
    };
    let f64_col = |name: &str| -> Result<Vec<Option<f64>>, EtlError> {
        let series = df.column(name)?.as_materialized_series();
        Ok(series.f64()?.into_iter().collect())
    };
    let required = |name: &'static str, value: Option<String>| {
        value.ok_or_else(|| EtlError::InvalidResponseFormat(format!("null {} in raw dataset", name)))
    };

    let segment = str_col("segment")?;
    let cod = str_col("cod")?;
    let asset = str_col("asset")?;
    let share_type = str_col("type")?;
    let part = f64_col("part")?;
    let part_acum = str_col("partAcum")?;
    let qty = f64_col("theoricalQty")?;
    let extraction_date = str_col("extraction_date")?;
    let extraction_timestamp = str_col("extraction_timestamp")?;
    let data_date = str_col("data_date")?;
    let total_qty = f64_col("total_theoretical_qty")?;
    let reductor = f64_col("reductor")?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let date = required("extraction_date", extraction_date[i].clone())?;
        let timestamp = required("extraction_timestamp", extraction_timestamp[i].clone())?;
        records.push(RawRecord {
            segment: segment[i].clone(),
            cod: required("cod", cod[i].clone())?,
            asset: required("asset", asset[i].clone())?,
            share_type: required("type", share_type[i].clone())?,
            part: part[i].ok_or_else(|| EtlError::InvalidResponseFormat("null part in raw dataset".to_string()))?,
            part_acum: part_acum[i].clone(),
            theoretical_qty: qty[i].ok_or_else(|| {
                EtlError::InvalidResponseFormat("null theoricalQty in raw dataset".to_string())
            })?,
            extraction_date: NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
                EtlError::InvalidResponseFormat(format!("bad extraction_date '{}': {}", date, e))
            })?,
            extraction_timestamp: NaiveDateTime::parse_from_str(&timestamp, TIMESTAMP_FORMAT)
                .map_err(|e| {
                    EtlError::InvalidResponseFormat(format!(
                        "bad extraction_timestamp '{}': {}",
                        timestamp, e
                    ))
                })?,
            data_date: data_date[i].clone(),
            total_theoretical_qty: total_qty[i],
            reductor: reductor[i],
        });
    }
    Ok(records)
}

/// Parquet files under a local root, laid out by [`Dataset::partition_key`].
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Writes `df` at `key`, replacing any existing file. Empty frames are refused.
    pub fn write(&self, key: &str, df: &mut DataFrame) -> Result<PathBuf, EtlError> {
        if df.height() == 0 {
            tracing::warn!("Empty dataset, not writing {}", key);
            return Err(EtlError::EmptyFrame(key.to_string()));
        }
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&path)?;
        ParquetWriter::new(&mut file).finish(df)?;
        tracing::info!("Wrote {} rows to {}", df.height(), path.display());
        Ok(path)
    }

    pub fn read(&self, key: &str) -> Result<DataFrame, EtlError> {
        read_parquet(&self.path_for(key))
    }
}

fn read_parquet(path: &Path) -> Result<DataFrame, EtlError> {
    tracing::info!("Reading {}", path.display());
    let file = File::open(path)?;
    Ok(ParquetReader::new(file).finish()?)
}
