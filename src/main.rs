use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use crossterm::event as term;

use row_panel::config::keybindings::{PanelContext, key_name};
use row_panel::config::loader;
use row_panel::config::types::AppConfig;
use row_panel::controller::{ControllerSettings, MemoryHistory, PanelController};
use row_panel::engine::{Engine, EngineHandle, Event, HttpEngine, Request, StubEngine};
use row_panel::script::{self, ReplayController, Script, Step};
use row_panel::surface::MemorySurface;
use row_panel::types::{Filters, PanelMode};
use row_panel::url::{canonical_url, parse_panel_url};

#[derive(Parser)]
#[command(name = "row-panel", version, about = "List/detail panel controller harness")]
struct Cli {
    /// Path to config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging to debug.log.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive the panel controller through a scripted session.
    Replay {
        /// TOML script of `[[step]]` entries.
        script: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Drive the panel controller from the keyboard. Ctrl+C quits.
    Interactive {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// List the key bindings in effect.
    Keys {
        /// Only the bindings for this panel state.
        #[arg(long, value_enum)]
        context: Option<ContextArg>,
    },
    /// Print the panel mode a URL denotes.
    Resolve {
        url: String,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// JSON fixture served by the offline engine.
    #[arg(long, conflicts_with = "live")]
    fixture: Option<PathBuf>,
    /// Talk to the `[gateway]` server instead of a fixture.
    #[arg(long)]
    live: bool,
    /// Address the page is loaded at, e.g. `/admin/rows/4/`.
    #[arg(long)]
    url: Option<String>,
    /// Active list filter, repeatable: `--filter status=draft`.
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ContextArg {
    List,
    Detail,
    Form,
}

impl From<ContextArg> for PanelContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::List => Self::Closed,
            ContextArg::Detail => Self::Detail,
            ContextArg::Form => Self::Form,
        }
    }
}

fn parse_filter(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{s}`"))
}

/// How long a step may wait for the engine before the replay moves on.
fn settle_timeout(config: &AppConfig) -> Duration {
    config
        .gateway
        .request_timeout_secs
        .map_or(Duration::from_secs(10), |secs| {
            Duration::from_secs(secs.saturating_add(1))
        })
}

/// Fetch page 1 through the engine so the list starts the way the server
/// would have rendered it.
fn first_page(engine: &EngineHandle, filters: &Filters, timeout: Duration) -> Result<MemorySurface> {
    let (tx, rx) = std::sync::mpsc::channel::<Event>();
    engine.send(Request::FetchPage {
        page: 1,
        filters: filters.clone(),
        reply_tx: tx,
    });
    let event = rx
        .recv_timeout(timeout)
        .context("engine did not answer the first page request")?;
    let Event::PageFetched { result, .. } = event else {
        bail!("unexpected engine reply to the first page request");
    };
    let page = result.context("failed to load the first page")?;
    Ok(MemorySurface::new(&page.html).with_has_more(page.has_more))
}

/// Build a controller over the chosen engine and settle its first paint.
fn start_session(config: &AppConfig, session: &SessionArgs) -> Result<ReplayController> {
    let initial_mode = match &session.url {
        Some(url) => parse_panel_url(&config.panel.base_path, url)
            .with_context(|| format!("`{url}` is not a panel URL under {}", config.panel.base_path))?,
        None => PanelMode::Closed,
    };

    let engine = if session.live {
        HttpEngine::new(config.gateway.clone()).start()
    } else {
        let Some(path) = session.fixture.as_deref() else {
            bail!("a session needs either --fixture <json> or --live");
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture: {}", path.display()))?;
        StubEngine::from_json(&json)
            .with_context(|| format!("invalid fixture: {}", path.display()))?
            .start()
    };

    let filters: Filters = session.filters.iter().cloned().collect();
    let settle = settle_timeout(config);
    let surface = first_page(&engine, &filters, settle)?
        .with_initial_mode(initial_mode)
        .with_filters(filters);

    let mut controller = PanelController::new(
        engine,
        surface,
        MemoryHistory::new(),
        ControllerSettings::from_config(config),
    );

    match controller.init() {
        Ok(_) => {
            controller.wait_idle(settle);
        }
        Err(rejected) => tracing::warn!("session: init rejected: {rejected}"),
    }
    println!(
        "{:<24} {:<28} mode={} rows={}",
        "init",
        "",
        controller.mode(),
        controller.rows().len()
    );
    Ok(controller)
}

fn replay(config: &AppConfig, script_path: &Path, session: &SessionArgs) -> Result<()> {
    let script = Script::load(script_path)?;
    let mut controller = start_session(config, session)?;

    for report in script::run(&mut controller, &script, settle_timeout(config)) {
        println!("{report}");
    }

    controller.teardown();
    Ok(())
}

fn interactive(config: &AppConfig, session: &SessionArgs) -> Result<()> {
    let mut controller = start_session(config, session)?;
    print_keys(config, Some(PanelContext::of(controller.mode())));

    crossterm::terminal::enable_raw_mode().context("failed to enable raw mode")?;
    let result = key_loop(&mut controller, settle_timeout(config));
    crossterm::terminal::disable_raw_mode().context("failed to restore the terminal")?;

    controller.teardown();
    result
}

/// Feed terminal key presses to the controller until Ctrl+C.
fn key_loop(controller: &mut ReplayController, settle: Duration) -> Result<()> {
    let mut stdout = std::io::stdout();
    loop {
        let term::Event::Key(key) = term::read().context("failed to read a terminal event")? else {
            continue;
        };
        let Some(name) = key_name(&key) else {
            continue;
        };
        if name == "ctrl+c" {
            return Ok(());
        }
        let report = script::run_step(controller, &Step::Key { key: name }, settle);
        // Raw mode does not translate newlines.
        write!(stdout, "{report}\r\n")?;
        stdout.flush()?;
    }
}

fn print_keys(config: &AppConfig, only: Option<PanelContext>) {
    let settings = ControllerSettings::from_config(config);
    let contexts: Vec<PanelContext> = only.map_or(PanelContext::ALL.to_vec(), |c| vec![c]);
    for context in contexts {
        println!("{}:", context.label());
        for line in settings.bindings.help(context) {
            println!("  {:<12} {:<28} {}", line.key, line.description, line.group);
        }
    }
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        let msg = format!("{info}\n\n{backtrace}");
        let _ = std::fs::write("panic.log", &msg);
        eprintln!("{msg}");
    }));

    let cli = Cli::parse();

    // Set up tracing.
    if cli.debug {
        let file = std::fs::File::create("debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(file)
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    }

    let config = loader::load_config(cli.config.as_deref())?;
    tracing::info!("row-panel starting");

    match cli.command {
        Commands::Resolve { url } => {
            let base = &config.panel.base_path;
            let mode = parse_panel_url(base, &url)
                .with_context(|| format!("`{url}` is not a panel URL under {base}"))?;
            println!("{mode}");
            println!("canonical: {}", canonical_url(base, mode));
            Ok(())
        }
        Commands::Replay { script, session } => replay(&config, &script, &session),
        Commands::Interactive { session } => interactive(&config, &session),
        Commands::Keys { context } => {
            print_keys(&config, context.map(PanelContext::from));
            Ok(())
        }
    }
}
