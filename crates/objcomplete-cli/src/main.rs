use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use objcomplete_client::{
    AutocompleteController, AutocompleteHooks, AutocompleteSession, ControllerState,
    ErrorIndicator, HttpBackend, LookupBackend, QueryRequest, RequestId, SessionHandle,
};
use objcomplete_core::{AppConfig, MatchFeedback, QueryKind, SuggestionItem};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "objcomplete",
    about = "Autocomplete object ids and names against a complete_object endpoint",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format.
    /// Also enabled by setting OBJCOMPLETE_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Location of the page hosting the input; the endpoint is resolved
    /// against its host and port. Also read from OBJCOMPLETE_PAGE_URL.
    #[arg(long, global = true)]
    page: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single lookup, bypassing debounce.
    Lookup { text: String },

    /// Treat each stdin line as the new input text.
    /// `:select N`, `:focus`, `:blur` and `:quit` are commands.
    Interactive,

    /// Check that the lookup endpoint answers.
    Health,

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Write the default configuration file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Terminal hooks ─────────────────────────────────────────────────────────

struct TerminalHooks {
    json: bool,
}

impl TerminalHooks {
    fn emit(&self, value: serde_json::Value) {
        println!("{value}");
    }
}

impl AutocompleteHooks for TerminalHooks {
    fn on_open(&mut self, items: &[SuggestionItem]) {
        if self.json {
            self.emit(serde_json::json!({ "event": "open", "items": items }));
            return;
        }
        for (i, item) in items.iter().enumerate() {
            println!("  [{i}] {:<32} {}", item.display_text(), item.oid);
        }
    }

    fn on_close(&mut self) {
        if self.json {
            self.emit(serde_json::json!({ "event": "close" }));
        }
    }

    fn on_select(&mut self, item: &SuggestionItem) {
        if self.json {
            self.emit(serde_json::json!({ "event": "select", "item": item }));
        } else {
            println!("show object {}", item.oid);
        }
    }

    fn on_error(&mut self, error: ErrorIndicator) {
        if self.json {
            self.emit(serde_json::json!({ "event": "error", "message": error.to_string() }));
        } else {
            eprintln!("! {error}");
        }
    }

    fn on_feedback(&mut self, feedback: MatchFeedback) {
        if self.json {
            self.emit(serde_json::json!({ "event": "feedback", "feedback": feedback }));
            return;
        }
        match feedback {
            MatchFeedback::NoMatch => println!("  (no match)"),
            MatchFeedback::TooMany(n) => println!("  ({n} matches, showing the first ones)"),
            MatchFeedback::Invalid => eprintln!("  (not an object id or name)"),
            _ => {}
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    // ── Env var overrides ──────────────────────────────────────────────────
    let json_output = cli.json || std::env::var("OBJCOMPLETE_JSON").as_deref() == Ok("1");
    let page = cli.page.or_else(|| std::env::var("OBJCOMPLETE_PAGE_URL").ok());

    let config = AppConfig::load()?;

    match cli.command {
        Commands::Lookup { text } => {
            let backend = open_backend(&config, page.as_deref())?;
            let start = Instant::now();
            let query = QueryRequest {
                id: RequestId(1),
                kind: QueryKind::classify(&text),
                text,
            };
            let items = backend.lookup(&query).await?;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": items, "total": items.len(), "text": query.text },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if items.is_empty() {
                println!("No objects match: {}", query.text);
            } else {
                for item in &items {
                    println!("{:<32} {}", item.display_text(), item.oid);
                }
            }
        }

        Commands::Interactive => {
            let backend = open_backend(&config, page.as_deref())?;
            info!(endpoint = backend.name(), "starting interactive session");
            let hooks = TerminalHooks { json: json_output };
            let controller = AutocompleteController::new(&config.input, hooks);
            let (handle, join) = AutocompleteSession::spawn(controller, Arc::new(backend));

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if !dispatch_line(&handle, &line) {
                    break;
                }
            }

            let settle = config.input.debounce() + config.endpoint.timeout();
            wait_until_idle(&handle, settle).await;
            handle.shutdown();
            join.await.context("interactive session panicked")?;
        }

        Commands::Health => {
            let backend = open_backend(&config, page.as_deref())?;
            let status = backend.health_check().await;
            if json_output {
                print_json(&serde_json::json!({
                    "status": if status.available { "ok" } else { "error" },
                    "data": {
                        "endpoint": backend.name(),
                        "available": status.available,
                        "latency_ms": status.latency_ms,
                        "last_checked": status.last_checked,
                        "error": status.error,
                    }
                }))?;
            } else if status.available {
                println!(
                    "{} is up ({} ms)",
                    backend.name(),
                    status.latency_ms.unwrap_or_default()
                );
            } else {
                println!(
                    "{} is unavailable: {}",
                    backend.name(),
                    status.error.unwrap_or_default()
                );
            }
            if !status.available {
                std::process::exit(6);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if json_output {
                    print_json(&serde_json::to_value(&config)?)?;
                } else {
                    println!("# {}", AppConfig::config_path().display());
                    print!("{}", config.to_toml_string()?);
                }
            }
            ConfigAction::Init { force } => {
                let path = AppConfig::config_path();
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                AppConfig::default().save_to(&path)?;
                println!("Wrote {}", path.display());
            }
        },
    }

    Ok(())
}

/// Returns `false` when the session should end. Bad commands are reported
/// and skipped.
fn dispatch_line(handle: &SessionHandle, line: &str) -> bool {
    match line.trim_end_matches(['\r', '\n']) {
        ":quit" | ":q" => false,
        ":focus" => handle.focus(),
        ":blur" => handle.blur(),
        cmd if cmd.starts_with(":select") => {
            match cmd[":select".len()..].trim().parse::<usize>() {
                Ok(index) => handle.select(index),
                Err(e) => {
                    eprintln!("! bad selection {cmd:?}: {e}");
                    true
                }
            }
        }
        text => handle.input_changed(text),
    }
}

/// Give the last keystroke time to debounce and its lookup time to answer.
async fn wait_until_idle(handle: &SessionHandle, limit: Duration) {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        match handle.snapshot().await {
            Some(s) if s.state == ControllerState::Idle => return,
            Some(_) => tokio::time::sleep(Duration::from_millis(20)).await,
            None => return,
        }
    }
}

fn open_backend(config: &AppConfig, page: Option<&str>) -> Result<HttpBackend> {
    let Some(page) = page.or(config.endpoint.page_url.as_deref()) else {
        bail!("no page location: pass --page, set OBJCOMPLETE_PAGE_URL or endpoint.page_url");
    };
    Ok(HttpBackend::from_config(page, &config.endpoint)?)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("OBJCOMPLETE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}
