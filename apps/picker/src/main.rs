use std::sync::Arc;

use anyhow::Result;
use cascade_core::{
    AlertSink, CascadeFormController, HttpTaxonomyApi, LevelPhase,
};
use clap::Parser;
use shared::domain::{EntityId, Level};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive cascading taxonomy picker against a running backend.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    server_url: String,
    /// Anti-forgery token expected by the backend's create endpoints.
    #[arg(long, default_value = "")]
    csrf_token: String,
}

struct StderrAlertSink;

impl AlertSink for StderrAlertSink {
    fn alert(&self, message: &str) {
        eprintln!("[alert] {message}");
    }
}

fn parse_level(name: &str) -> Option<Level> {
    Level::ALL
        .iter()
        .copied()
        .find(|level| level.as_str() == name)
}

async fn print_states(controller: &CascadeFormController) {
    for level in Level::ALL {
        let state = controller.level_state(level).await;
        let status = match state.phase {
            LevelPhase::Disabled => "disabled",
            LevelPhase::Loading => "loading",
            LevelPhase::Populated => "enabled",
        };
        let options = state
            .options
            .iter()
            .map(|option| match option.value {
                Some(id) => format!("{id}:{}", option.label),
                None => option.label.clone(),
            })
            .collect::<Vec<_>>()
            .join(" | ");
        let selection = state
            .selection
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{level:>8} [{status}] selection={selection} options: {options}");
    }
}

fn print_help() {
    println!("commands: show | pick <level> <id> | clear <level> | new <level> <name> | quit");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let api = Arc::new(HttpTaxonomyApi::new(args.server_url, args.csrf_token));
    let controller = CascadeFormController::new_with_surfaces(api, Arc::new(StderrAlertSink));

    let mut events = controller.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::debug!(?event, "cascade event");
        }
    });

    controller.start().await;
    print_help();
    print_states(&controller).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut parts = line.split_whitespace();
        match parts.next() {
            None | Some("show") => {}
            Some("pick") => {
                let level = parts.next().and_then(parse_level);
                let id = parts.next().and_then(|raw| raw.parse::<i64>().ok());
                match (level, id) {
                    (Some(level), Some(id)) => {
                        controller.select(level, Some(EntityId(id))).await;
                    }
                    _ => print_help(),
                }
            }
            Some("clear") => match parts.next().and_then(parse_level) {
                Some(level) => controller.select(level, None).await,
                None => print_help(),
            },
            Some("new") => {
                let level = parts.next().and_then(parse_level);
                let name = parts.collect::<Vec<_>>().join(" ");
                match level {
                    Some(level) => {
                        // Failures are already alerted and logged by the
                        // controller; nothing further to do here.
                        let _ = controller.create_item(level, &name).await;
                    }
                    None => print_help(),
                }
            }
            Some("quit") | Some("exit") => break,
            Some(_) => print_help(),
        }
        print_states(&controller).await;
    }

    Ok(())
}
