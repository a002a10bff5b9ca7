use std::io::IsTerminal;

use clap::ValueEnum;

use crate::exit::{CliError, DATA_INVALID};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Render bytes as uppercase hex, space-separated: `AA 04 26`.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex byte tokens, tolerating whitespace, commas, and `0x` prefixes.
pub fn parse_hex(raw: &str) -> Result<Vec<u8>, CliError> {
    let mut bytes = Vec::new();
    for token in raw.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        let digits = token.strip_prefix("0x").unwrap_or(token);
        // Allow packed runs like "AA0426" as well as single bytes.
        if digits.len() % 2 != 0 {
            return Err(CliError::new(
                DATA_INVALID,
                format!("odd-length hex token '{token}'"),
            ));
        }
        for pair in 0..digits.len() / 2 {
            let chunk = &digits[pair * 2..pair * 2 + 2];
            let byte = u8::from_str_radix(chunk, 16).map_err(|_| {
                CliError::new(DATA_INVALID, format!("invalid hex token '{token}'"))
            })?;
            bytes.push(byte);
        }
    }
    Ok(bytes)
}
