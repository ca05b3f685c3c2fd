use anyhow::Result;
use b3etl_lib::SummaryRecord;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Asset")]
    acao: String,
    #[tabled(rename = "Codes")]
    qtd_codigo: i64,
    #[tabled(rename = "Weight (%)")]
    participacao: String,
    #[tabled(rename = "Theoretical Qty")]
    qtd_teorica_total: String,
    #[tabled(rename = "Date")]
    data: String,
}

fn build_summary_rows(rows: &[SummaryRecord]) -> Vec<SummaryRow> {
    rows.iter()
        .map(|r| SummaryRow {
            acao: r.acao.clone(),
            qtd_codigo: r.qtd_codigo,
            participacao: format!("{:.3}", r.participacao),
            qtd_teorica_total: format_thousands(r.qtd_teorica_total),
            data: r.data.clone(),
        })
        .collect()
}

pub fn print_summary(rows: &[SummaryRecord], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", Table::new(build_summary_rows(rows))),
        OutputFormat::Markdown => {
            let mut table = Table::new(build_summary_rows(rows));
            table.with(Style::markdown());
            println!("{}", table);
        }
        // JSON and CSV keep raw numbers so downstream tools can parse them.
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rows)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}
