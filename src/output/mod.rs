//! Rendering command results for stdout.

use std::io::Write;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

use crate::error::{PlaidCliError, Result};
use crate::provider::Transaction;

/// Output format for `transactions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        raw.parse().map_err(|_| {
            PlaidCliError::InvalidArgument(format!(
                "Invalid output format `{raw}`. Valid formats are 'json' and 'csv'"
            ))
        })
    }
}

/// Pretty-print `value` as JSON with a trailing newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write transactions in `format`.
pub fn write_transactions<W: Write>(
    out: &mut W,
    format: OutputFormat,
    transactions: &[Transaction],
) -> Result<()> {
    match format {
        OutputFormat::Json => write_json(out, transactions),
        OutputFormat::Csv => write_csv(out, transactions),
    }
}

fn write_csv<W: Write>(out: &mut W, transactions: &[Transaction]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(["Date", "Amount", "Description"])?;
    for transaction in transactions {
        // Commas are dropped from descriptions; line breaks would split the row.
        let description = transaction.name.replace(',', "").replace(['\r', '\n'], " ");
        let amount = format!("{:.6}", transaction.amount);
        writer.write_record([transaction.date.as_str(), amount.as_str(), description.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn transaction(date: &str, amount: f64, name: &str) -> Transaction {
        serde_json::from_value(serde_json::json!({
            "transaction_id": "t1",
            "account_id": "a1",
            "amount": amount,
            "iso_currency_code": "USD",
            "date": date,
            "name": name,
            "merchant_name": null,
            "pending": false,
        }))
        .unwrap()
    }

    #[test]
    fn csv_strips_commas_and_prints_six_decimals() {
        let mut out = Vec::new();
        let rows = vec![
            transaction("2024-01-02", 12.5, "Coffee, Inc"),
            transaction("2024-01-03", -400.0, "Payroll"),
        ];
        write_transactions(&mut out, OutputFormat::Csv, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Date,Amount,Description\n2024-01-02,12.500000,Coffee Inc\n2024-01-03,-400.000000,Payroll\n"
        );
    }

    #[test]
    fn csv_quotes_descriptions_containing_quotes() {
        let mut out = Vec::new();
        let rows = vec![transaction("2024-01-02", 3.5, "Joe \"Bob\" Diner")];
        write_transactions(&mut out, OutputFormat::Csv, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Date,Amount,Description\n2024-01-02,3.500000,\"Joe \"\"Bob\"\" Diner\"\n"
        );
    }

    #[test]
    fn csv_keeps_multiline_descriptions_on_one_row() {
        let mut out = Vec::new();
        let rows = vec![transaction("2024-01-02", 1.0, "Corner\nStore")];
        write_transactions(&mut out, OutputFormat::Csv, &rows).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Date,Amount,Description\n2024-01-02,1.000000,Corner Store\n"
        );
    }

    #[test]
    fn json_is_pretty_printed() {
        let mut out = Vec::new();
        write_json(&mut out, &serde_json::json!({"chase": "item_123"})).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\n  \"chase\": \"item_123\"\n}\n"
        );
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!(OutputFormat::parse("CSV").unwrap(), OutputFormat::Csv);
        assert!(matches!(
            OutputFormat::parse("xml"),
            Err(PlaidCliError::InvalidArgument(_))
        ));
    }
}
