use super::load_config;
use crate::output::{print_json, print_table};
use std::path::Path;

pub fn run(explicit: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = load_config(explicit)?;
    config.ensure_valid()?;
    let params = config.actuator_params();

    if json {
        let value: Vec<_> = params
            .iter()
            .map(|p| {
                serde_json::json!({
                    "index": p.id,
                    "pin": p.pin,
                    "row": p.row + 1,
                    "column": p.column + 1,
                })
            })
            .collect();
        return print_json(&value);
    }

    let rows = params
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.pin.to_string(),
                (p.row + 1).to_string(),
                (p.column + 1).to_string(),
            ]
        })
        .collect();
    print_table(&["INDEX", "PIN", "ROW", "COLUMN"], rows);
    Ok(())
}
