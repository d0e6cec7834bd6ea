//! Query input parsing and result rendering.

use colored::Colorize;
use skywire_client::{ClientError, Param, Response};
use std::error::Error;

/// Parses each argument as a JSON literal parameter.
pub fn parse_params<S: AsRef<str>>(args: &[S]) -> Result<Vec<Param>, Box<dyn Error>> {
    args.iter()
        .map(|arg| -> Result<Param, Box<dyn Error>> {
            let json: serde_json::Value = serde_json::from_str(arg.as_ref())
                .map_err(|e| format!("invalid parameter {:?}: {}", arg.as_ref(), e))?;
            Ok(Param::try_from(json)?)
        })
        .collect()
}

/// Splits a REPL line of the form `query <- param, param, ...`.
pub fn parse_line(line: &str) -> Result<(String, Vec<Param>), Box<dyn Error>> {
    let Some((query, params)) = line.split_once(" <- ") else {
        return Ok((line.trim().to_string(), Vec::new()));
    };
    let json: serde_json::Value = serde_json::from_str(&format!("[{}]", params))
        .map_err(|e| format!("invalid parameters: {}", e))?;
    let params = match Param::try_from(json)? {
        Param::List(params) => params,
        other => vec![other],
    };
    Ok((query.trim().to_string(), params))
}

/// Renders a response for the terminal.
pub fn render(response: &Response) -> String {
    match response {
        Response::Empty => "OK".green().to_string(),
        Response::Row(row) => to_json(row),
        Response::Table(table) => {
            format!(
                "{}\n{} row(s), {} column(s)",
                to_json(&table.rows()),
                table.row_count(),
                table.column_count()
            )
        }
        Response::Value(value) => to_json(value),
    }
}

pub fn render_error(err: &ClientError) -> String {
    match err {
        ClientError::Server { code } => format!("{} {}", "Server error".red(), code),
        other => format!("{}: {}", "Error".red(), other),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}
