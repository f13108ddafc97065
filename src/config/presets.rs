//! Built-in preset tables
//!
//! Three use-case labels per optimizer: `low_memory` keeps the optional
//! buffers off, `consumer` is the balanced default, `high_memory` turns on
//! everything that trades memory for convergence quality.

use std::collections::HashMap;

use serde_json::json;

use super::{ParamMap, PresetTable};

fn preset(pairs: &[(&str, serde_json::Value)]) -> ParamMap {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn adabelief_table() -> PresetTable {
    let mut table = PresetTable::new();
    table.insert(
        "low_memory".to_string(),
        preset(&[
            ("optimizer", json!("adabelief")),
            ("lr", json!(1e-4)),
            ("betas", json!([0.9, 0.999])),
            ("eps", json!(1e-8)),
            ("weight_decay", json!(0.01)),
            ("weight_decouple", json!(true)),
            ("rectify", json!(false)),
            ("ams_bound", json!(false)),
            ("adanorm", json!(false)),
        ]),
    );
    table.insert(
        "consumer".to_string(),
        preset(&[
            ("optimizer", json!("adabelief")),
            ("lr", json!(1e-4)),
            ("betas", json!([0.9, 0.999])),
            ("eps", json!(1e-8)),
            ("weight_decay", json!(0.01)),
            ("weight_decouple", json!(true)),
            ("rectify", json!(true)),
            ("ams_bound", json!(false)),
            ("adanorm", json!(false)),
        ]),
    );
    table.insert(
        "high_memory".to_string(),
        preset(&[
            ("optimizer", json!("adabelief")),
            ("lr", json!(5e-5)),
            ("betas", json!([0.9, 0.999])),
            ("eps", json!(1e-8)),
            ("weight_decay", json!(0.01)),
            ("weight_decouple", json!(true)),
            ("rectify", json!(true)),
            ("ams_bound", json!(true)),
            ("adanorm", json!(true)),
            ("r", json!(0.95)),
        ]),
    );
    table
}

fn adamw_table() -> PresetTable {
    let mut table = PresetTable::new();
    table.insert(
        "low_memory".to_string(),
        preset(&[
            ("optimizer", json!("adamw")),
            ("lr", json!(1e-4)),
            ("betas", json!([0.9, 0.999])),
            ("eps", json!(1e-8)),
            ("weight_decay", json!(0.01)),
        ]),
    );
    table.insert(
        "consumer".to_string(),
        preset(&[
            ("optimizer", json!("adamw")),
            ("lr", json!(1e-3)),
            ("betas", json!([0.9, 0.999])),
            ("eps", json!(1e-8)),
            ("weight_decay", json!(0.01)),
        ]),
    );
    table.insert(
        "high_memory".to_string(),
        preset(&[
            ("optimizer", json!("adamw")),
            ("lr", json!(5e-5)),
            ("betas", json!([0.9, 0.999])),
            ("eps", json!(1e-8)),
            ("weight_decay", json!(0.05)),
        ]),
    );
    table
}

fn sgd_table() -> PresetTable {
    let mut table = PresetTable::new();
    table.insert(
        "low_memory".to_string(),
        preset(&[("optimizer", json!("sgd")), ("lr", json!(1e-2)), ("momentum", json!(0.0))]),
    );
    table.insert(
        "consumer".to_string(),
        preset(&[("optimizer", json!("sgd")), ("lr", json!(1e-2)), ("momentum", json!(0.9))]),
    );
    table.insert(
        "high_memory".to_string(),
        preset(&[("optimizer", json!("sgd")), ("lr", json!(1e-3)), ("momentum", json!(0.9))]),
    );
    table
}

/// All built-in preset tables, keyed by lowercase optimizer id
pub(super) fn builtin_tables() -> HashMap<String, PresetTable> {
    let mut tables = HashMap::new();
    tables.insert("adabelief".to_string(), adabelief_table());
    tables.insert("adamw".to_string(), adamw_table());
    tables.insert("sgd".to_string(), sgd_table());
    tables
}
