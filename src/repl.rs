//! Interactive REPL.

use crate::format::{parse_line, render, render_error};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use skywire_client::{Client, Query};
use std::path::Path;

const HELP_TEXT: &str = r#"
Enter a query, optionally followed by ` <- ` and comma-separated JSON parameters:

  CREATE SPACE myspace
  INSERT INTO myspace.users(?, ?) <- "sayan", 42
  SELECT * FROM myspace.users WHERE username = ? <- "sayan"

Commands:
  help                          Show this help
  quit, exit                    Exit the REPL
"#;

pub async fn run(client: Client, history_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "skywire".bold().cyan());
    println!("Connecting to {}...", client.config().endpoint());

    client.connect().await?;
    println!("{}", "Connected!".green());

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;
    let _ = rl.load_history(history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "skywire>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                match line {
                    "" => continue,
                    "help" => println!("{}", HELP_TEXT),
                    "quit" | "exit" => break,
                    _ => {
                        execute_line(&client, line).await;
                        if !client.is_connected().await {
                            println!("{}", "Connection lost.".red());
                            break;
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(history_path);

    let _ = client.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_line(client: &Client, line: &str) {
    let (text, params) = match parse_line(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            println!("{}: {}\n", "Error".red(), e);
            return;
        }
    };

    let mut query = Query::new(text);
    for param in params {
        query.push_param(param);
    }

    match client.query(&query).await {
        Ok(response) => println!("{}\n", render(&response)),
        Err(e) => println!("{}\n", render_error(&e)),
    }
}
