use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mrlcomm_registry::{methods, Direction, MethodDescriptor};
use serde::Serialize;

use crate::cmd::MethodsArgs;
use crate::exit::{CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct MethodOutput {
    id: u8,
    name: &'static str,
    direction: &'static str,
    params: Vec<&'static str>,
}

fn schema_tokens(descriptor: &MethodDescriptor) -> Vec<&'static str> {
    descriptor.params.iter().map(|ty| ty.token()).collect()
}

pub fn run(args: MethodsArgs, format: OutputFormat) -> CliResult<i32> {
    let filter = match args.direction.as_deref() {
        None => None,
        Some("command") => Some(Direction::Command),
        Some("event") => Some(Direction::Event),
        Some(other) => {
            return Err(CliError::new(
                USAGE,
                format!("unknown direction '{other}' (expected command or event)"),
            ))
        }
    };

    let selected: Vec<&MethodDescriptor> = methods()
        .iter()
        .filter(|descriptor| filter.is_none_or(|wanted| descriptor.direction == wanted))
        .collect();

    match format {
        OutputFormat::Json => {
            let out: Vec<MethodOutput> = selected
                .iter()
                .map(|descriptor| MethodOutput {
                    id: descriptor.id,
                    name: descriptor.name,
                    direction: descriptor.direction.as_str(),
                    params: schema_tokens(descriptor),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "NAME", "DIRECTION", "PARAMS"]);
            for descriptor in &selected {
                table.add_row(vec![
                    descriptor.id.to_string(),
                    descriptor.name.to_string(),
                    descriptor.direction.as_str().to_string(),
                    schema_tokens(descriptor).join("/"),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for descriptor in &selected {
                println!(
                    "{:3}  {:7}  {}({})",
                    descriptor.id,
                    descriptor.direction.as_str(),
                    descriptor.name,
                    schema_tokens(descriptor).join(", ")
                );
            }
        }
    }

    Ok(SUCCESS)
}
