//! CLI binary for autogame.

use anyhow::{Context, bail};
use autogame::engine::{Backends, Engine, EngineCommand, EngineEvent, Iteration, Stores};
use autogame::executor::ExecutorRegistry;
use autogame::vision::parse_cooldown;
use autogame::{app_dirs, Account, AutomationConfig, GameTask, TaskCategory, TaskPriority};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Autogame: scheduled automation of emulated game sessions.
#[derive(Parser)]
#[command(name = "autogame", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory holding tasks.json and accounts.json.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the automation engine until Ctrl+C.
    Run {
        /// Run a single iteration and exit.
        #[arg(long)]
        once: bool,
    },

    /// Manage tasks.
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Parse countdown text the way the engine reads it from the screen.
    Cooldown { text: String },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List tasks by due time.
    List,
    /// Add a task, due immediately.
    Add {
        name: String,
        #[arg(long, value_enum)]
        category: CategoryArg,
        #[arg(long, value_enum, default_value = "medium")]
        priority: PriorityArg,
        /// Template image clicked by the executor; repeat for each step.
        #[arg(long = "template")]
        templates: Vec<PathBuf>,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        fallback_cooldown_secs: Option<u64>,
    },
    /// Remove a task by id.
    Remove { id: String },
    /// Re-enable a task and clear its failure count.
    Enable { id: String },
    /// Exclude a task from scheduling.
    Disable { id: String },
}

#[derive(Subcommand)]
enum AccountAction {
    /// List accounts by name.
    List,
    /// Add an active account.
    Add {
        name: String,
        /// Title of the emulator window for this account.
        #[arg(long)]
        window: String,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
    /// Remove an account by id.
    Remove { id: String },
    /// Include an account in rotation.
    Activate { id: String },
    /// Exclude an account from rotation.
    Deactivate { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Quest,
    Guild,
    Gift,
    Admin,
}

impl From<CategoryArg> for TaskCategory {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Quest => Self::Quest,
            CategoryArg::Guild => Self::Guild,
            CategoryArg::Gift => Self::Gift,
            CategoryArg::Admin => Self::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Medium => Self::Medium,
            PriorityArg::High => Self::High,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AutomationConfig::default_config_path);

    if let Command::Config {
        action: ConfigAction::Init { force },
    } = &cli.command
    {
        return init_config(&config_path, *force);
    }

    let mut config = match &cli.config {
        Some(path) => AutomationConfig::from_file(path)?,
        None => AutomationConfig::load_or_default(&config_path)?,
    };
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }
    config.validate()?;

    let logs_dir = match &config.storage.data_dir {
        Some(dir) => dir.join("logs"),
        None => app_dirs::logs_dir(),
    };
    let _log_guard = init_tracing(&logs_dir)?;

    match cli.command {
        Command::Run { once } => run(config, once).await,
        Command::Tasks { action } => tasks(&config, action),
        Command::Accounts { action } => accounts(&config, action),
        Command::Cooldown { text } => {
            let cooldown = parse_cooldown(&text);
            println!("{} ({}s)", format_duration(cooldown), cooldown.as_secs());
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}

/// Log to stderr and to a daily-rolling file under `logs_dir`.
fn init_tracing(
    logs_dir: &Path,
) -> anyhow::Result<tracing_appender::non_blocking::WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("cannot create log dir {}", logs_dir.display()))?;
    let appender = tracing_appender::rolling::daily(logs_dir, "autogame.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("autogame=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false),
        )
        .init();
    Ok(guard)
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    AutomationConfig::default().save_to_file(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run(config: AutomationConfig, once: bool) -> anyhow::Result<()> {
    println!("Autogame v{}", env!("CARGO_PKG_VERSION"));

    let Some(backends) = Backends::detect() else {
        bail!("no desktop backend is available on this host; refusing to run tasks");
    };
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut engine = Engine::new(
        &config,
        backends,
        ExecutorRegistry::with_defaults(&config),
        Stores::open(&config.storage),
        events_tx,
    );
    engine.load_data()?;

    if once {
        let iteration = tokio::task::block_in_place(|| engine.run_once())?;
        while let Ok(event) = events_rx.try_recv() {
            print_event(&event);
        }
        match iteration {
            Iteration::Idle(reason) => println!("Nothing to do: {reason:?}"),
            Iteration::Attempted { task_name, success } => {
                println!("{task_name}: {}", if success { "ok" } else { "failed" });
            }
        }
        return Ok(());
    }

    engine.start()?;
    println!("Engine running. Press Ctrl+C to stop.\n");

    loop {
        tokio::select! {
            event = events_rx.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    info!("received Ctrl+C, shutting down...");
                }
                break;
            }
        }
    }

    tokio::task::block_in_place(|| engine.stop());
    while let Ok(event) = events_rx.try_recv() {
        print_event(&event);
    }
    Ok(())
}

fn print_event(event: &EngineEvent) {
    match event {
        EngineEvent::Log { level, message } => println!("[{level}] {message}"),
        EngineEvent::TaskCompleted { task_name, success } => {
            let outcome = if *success { "completed" } else { "failed" };
            println!("[TASK] {task_name} {outcome}");
        }
    }
}

fn open_stores(config: &AutomationConfig) -> Stores {
    let mut stores = Stores::open(&config.storage);
    stores.load_all();
    stores
}

fn apply(stores: &mut Stores, command: EngineCommand, id: &str) -> anyhow::Result<()> {
    if !stores.apply(command)? {
        bail!("no record with id {id}");
    }
    Ok(())
}

fn tasks(config: &AutomationConfig, action: TaskAction) -> anyhow::Result<()> {
    let mut stores = open_stores(config);
    match action {
        TaskAction::List => {
            println!(
                "{:<36}  {:<20}  {:<6}  {:<6}  {:<8}  {:<7}  NEXT RUN",
                "ID", "NAME", "KIND", "PRIO", "ENABLED", "RETRIES"
            );
            for task in stores.scheduler.by_next_run() {
                println!(
                    "{:<36}  {:<20}  {:<6}  {:<6}  {:<8}  {:<7}  {}",
                    task.id,
                    task.name,
                    task.category.to_string(),
                    task.priority.to_string(),
                    task.enabled,
                    format!("{}/{}", task.retry_count, task.max_retries),
                    task.next_run.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        TaskAction::Add {
            name,
            category,
            priority,
            templates,
            max_retries,
            fallback_cooldown_secs,
        } => {
            let mut task = GameTask::new(name, category.into())
                .with_priority(priority.into())
                .with_templates(templates);
            if let Some(max_retries) = max_retries {
                task.max_retries = max_retries;
            }
            if let Some(secs) = fallback_cooldown_secs {
                task.fallback_cooldown_secs = secs;
            }
            let id = task.id.clone();
            stores.apply(EngineCommand::AddTask(task))?;
            println!("Added task {id}");
        }
        TaskAction::Remove { id } => {
            apply(&mut stores, EngineCommand::RemoveTask(id.clone()), &id)?;
        }
        TaskAction::Enable { id } => {
            let command = EngineCommand::SetTaskEnabled {
                id: id.clone(),
                enabled: true,
            };
            apply(&mut stores, command, &id)?;
        }
        TaskAction::Disable { id } => {
            let command = EngineCommand::SetTaskEnabled {
                id: id.clone(),
                enabled: false,
            };
            apply(&mut stores, command, &id)?;
        }
    }
    Ok(())
}

fn accounts(config: &AutomationConfig, action: AccountAction) -> anyhow::Result<()> {
    let mut stores = open_stores(config);
    match action {
        AccountAction::List => {
            println!(
                "{:<36}  {:<16}  {:<24}  {:<5}  {:<6}  LAST RUN",
                "ID", "NAME", "WINDOW", "SCALE", "ACTIVE"
            );
            for account in stores.rotator.by_name() {
                let last_run = if account.has_run() {
                    account.last_run.format("%Y-%m-%d %H:%M:%S").to_string()
                } else {
                    "never".to_owned()
                };
                println!(
                    "{:<36}  {:<16}  {:<24}  {:<5}  {:<6}  {last_run}",
                    account.id, account.name, account.window_title, account.scale_factor, account.active
                );
            }
        }
        AccountAction::Add {
            name,
            window,
            scale,
        } => {
            let account = Account::new(name, window).with_scale_factor(scale);
            let id = account.id.clone();
            stores.apply(EngineCommand::AddAccount(account))?;
            println!("Added account {id}");
        }
        AccountAction::Remove { id } => {
            apply(&mut stores, EngineCommand::RemoveAccount(id.clone()), &id)?;
        }
        AccountAction::Activate { id } => {
            let command = EngineCommand::SetAccountActive {
                id: id.clone(),
                active: true,
            };
            apply(&mut stores, command, &id)?;
        }
        AccountAction::Deactivate { id } => {
            let command = EngineCommand::SetAccountActive {
                id: id.clone(),
                active: false,
            };
            apply(&mut stores, command, &id)?;
        }
    }
    Ok(())
}

fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (days, hours, minutes, seconds) = (
        total / 86_400,
        total % 86_400 / 3_600,
        total % 3_600 / 60,
        total % 60,
    );
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
