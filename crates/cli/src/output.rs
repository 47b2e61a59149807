use crate::error::CliError;
use model::{pagination::page::FetchResult, records::row::RowData};
use serde_json::json;

fn page_report(page: &FetchResult) -> serde_json::Value {
    let records = page.rows.iter().map(RowData::to_json).collect::<Vec<_>>();
    json!({
        "records": records,
        "next_cursor": page.next_cursor,
        "has_next": page.has_next(),
        "took_ms": page.took_ms as u64,
    })
}

pub fn print_page(page: &FetchResult) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(&page_report(page)).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}

/// One compact JSON object per line.
pub fn print_records(rows: &[RowData]) -> Result<(), CliError> {
    for row in rows {
        let line = serde_json::to_string(&row.to_json()).map_err(CliError::JsonSerialize)?;
        println!("{line}");
    }
    Ok(())
}

pub fn print_pretty<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::core::value::{FieldValue, Value};

    #[test]
    fn final_page_report_has_empty_cursor() {
        let page = FetchResult {
            rows: vec![RowData::new(
                "people.csv",
                vec![
                    FieldValue::new("id".to_string(), Value::Int64(1)),
                    FieldValue::new("name".to_string(), Value::Null),
                ],
            )],
            next_cursor: String::new(),
            reached_end: true,
            row_count: 1,
            took_ms: 3,
        };
        let report = page_report(&page);
        assert_eq!(report["records"][0], json!({ "id": 1, "name": null }));
        assert_eq!(report["next_cursor"], json!(""));
        assert_eq!(report["has_next"], json!(false));
    }
}
