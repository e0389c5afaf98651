use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::cell;

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(rows)) = map.get("results") {
                print_screen(rows, map);
            } else if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(map);
            }
        }
        Value::Array(rows) => print_rows(rows),
        _ => println!("{}", value),
    }
}

fn print_screen(rows: &[Value], envelope: &Map<String, Value>) {
    print_rows(rows);

    if let Some(Value::Array(failures)) = envelope.get("failures") {
        if !failures.is_empty() {
            println!("\nSkipped:");
            for f in failures {
                let symbol = f.get("symbol").map(cell).unwrap_or_default();
                let message = f.get("message").map(cell).unwrap_or_default();
                println!("  - {}: {}", symbol.bold(), message);
            }
        }
    }

    print_warnings(envelope);

    if let Some(Value::Object(summary)) = envelope.get("summary") {
        let count = |key: &str| summary.get(key).map(cell).unwrap_or_default();
        println!(
            "\nScreened {}, valued {}, skipped {}, undervalued {}",
            count("screened"),
            count("valued"),
            count("failed"),
            count("undervalued").green()
        );
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result {
        Value::Object(res_map) => print_flat_object(res_map),
        _ => print_flat_object(envelope),
    }

    print_warnings(envelope);

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_warnings(envelope: &Map<String, Value>) {
    let Some(Value::Array(warnings)) = envelope.get("warnings") else {
        return;
    };
    if warnings.is_empty() {
        return;
    }
    println!("\nWarnings:");
    for w in warnings {
        match w {
            Value::String(s) => println!("  - {}", s.yellow()),
            Value::Object(m) => println!(
                "  - {}: {}",
                m.get("symbol").map(cell).unwrap_or_default(),
                m.get("message").map(cell).unwrap_or_default().yellow()
            ),
            _ => {}
        }
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        println!("(no symbols)");
        return;
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);

    for item in rows {
        if let Value::Object(map) = item {
            let row: Vec<String> = headers
                .iter()
                .map(|h| map.get(h.as_str()).map(cell).unwrap_or_default())
                .collect();
            builder.push_record(row);
        }
    }

    println!("{}", Table::from(builder));
}
