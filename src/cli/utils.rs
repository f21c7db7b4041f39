use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Print tiers as a table (text) or a JSON array
pub fn output_tiers<T: Serialize>(output_format: &OutputFormat, tiers: &[T]) -> anyhow::Result<()> {
    let rows = serde_json::to_value(tiers)?;

    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Text => {
            let rows = rows.as_array().cloned().unwrap_or_default();
            if rows.is_empty() {
                println!("No waterfall tiers");
                return Ok(());
            }
            for row in rows.iter() {
                println!("{}", format_tier_line(row));
            }
        }
    }
    Ok(())
}

/// One-line summary of a camelCase tier object
pub fn format_tier_line(row: &Value) -> String {
    let number = row.get("tierNumber").map(display_number).unwrap_or_else(|| "?".to_string());
    let name = row.get("tierName").and_then(|v| v.as_str()).unwrap_or("-");
    let lp = row.get("lpSharePercent").map(display_number).unwrap_or_default();
    let gp = row.get("gpSharePercent").map(display_number).unwrap_or_default();

    let mut line = format!("#{} {:<20} LP {:>6}%  GP {:>6}%", number, name, lp, gp);
    if let Some(irr) = row.get("thresholdIrr").filter(|v| !v.is_null()) {
        line.push_str(&format!("  hurdle {}% IRR", display_number(irr)));
    }
    if let Some(amount) = row.get("thresholdAmount").filter(|v| !v.is_null()) {
        line.push_str(&format!("  threshold {}", display_number(amount)));
    }
    if row.get("isActive").and_then(|v| v.as_bool()) == Some(false) {
        line.push_str("  (inactive)");
    }
    line
}

fn display_number(value: &Value) -> String {
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 => format!("{}", f as i64),
        Some(f) => format!("{}", f),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_tier_with_hurdle() {
        let line = format_tier_line(&json!({
            "tierNumber": 2,
            "tierName": "Preferred Return",
            "lpSharePercent": 100.0,
            "gpSharePercent": 0.0,
            "thresholdIrr": 8.0,
            "thresholdAmount": null,
            "isActive": true
        }));
        assert!(line.starts_with("#2 Preferred Return"));
        assert!(line.contains("LP    100%"));
        assert!(line.contains("hurdle 8% IRR"));
        assert!(!line.contains("threshold "));
        assert!(!line.contains("inactive"));
    }

    #[test]
    fn marks_inactive_and_fractional_shares() {
        let line = format_tier_line(&json!({
            "tierNumber": 4,
            "lpSharePercent": 82.5,
            "gpSharePercent": 17.5,
            "isActive": false
        }));
        assert!(line.contains("82.5%"));
        assert!(line.contains("(inactive)"));
    }
}
