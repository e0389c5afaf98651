use serde_json::Value;

use super::cell;

/// Fields worth printing alone, most useful first.
const PRIORITY_KEYS: [&str; 3] = [
    "upside_potential",
    "is_undervalued",
    "dcf_target_per_share_price",
];

/// Print just the key answer.
///
/// A screen prints one `SYMBOL upside` line per valued symbol; anything else
/// prints the first priority field found in its `result`, falling back to
/// the first field.
pub fn print_minimal(value: &Value) {
    if let Some(Value::Array(rows)) = value.get("results") {
        for row in rows {
            println!(
                "{} {}",
                row.get("symbol").map(cell).unwrap_or_default(),
                row.get("upside_potential").map(cell).unwrap_or_default()
            );
        }
        return;
    }

    let result_obj = value.get("result").unwrap_or(value);

    if let Value::Object(map) = result_obj {
        for key in PRIORITY_KEYS {
            if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
                println!("{}", cell(val));
                return;
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, cell(val));
            return;
        }
    }

    println!("{}", cell(result_obj));
}
