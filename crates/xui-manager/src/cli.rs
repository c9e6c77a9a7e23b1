//! Command-line interface for xui-bulk.
//!
//! # Usage
//!
//! ```bash
//! # Interactive menu (default)
//! xui-bulk
//!
//! # List inbounds and clients
//! xui-bulk inbounds
//! xui-bulk clients --inbound 3 --search alice
//!
//! # Give every expired client 30 more days, without asking
//! xui-bulk bulk --time expired --days 30 --yes
//!
//! # Single client actions
//! xui-bulk client alice@example.com extend 30
//! xui-bulk client alice@example.com --inbound 3 set --days 0 --gb 50
//! ```

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use xui_config::{
    BackupMethodConfig, CliOverrides, Config, ConfigError, RestartPolicy, apply_overrides,
    defaults::DEFAULT_CONFIG_FILE, load_config, load_or_default, resolve_database,
    validate_config,
};
use xui_engine::{
    BulkScenario, ManualAction, Operation, PlannedChange, Reconciler, Scope, TimeAxis,
    TrafficAxis, now_millis,
};
use xui_store::sql::{SqlitePanelStore, SqliteStoreConfig};
use xui_store::{BackupMethod, PanelStore};

use crate::logging::init_tracing;
use crate::prompt::Prompt;
use crate::render;
use crate::restart::{PanelRestarter, SystemRestarter};
use crate::shell::{Shell, ShellSettings, offer_restart};

/// xui-bulk CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "xui-bulk",
    version,
    about = "Bulk and single-client editor for x-ui panel subscriptions"
)]
pub struct ManagerArgs {
    /// Config file path (json/yaml/toml) [default: xui-bulk.toml if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive menu.
    Shell,

    /// List inbounds.
    Inbounds,

    /// List clients.
    Clients {
        /// Only clients of this inbound.
        #[arg(short, long)]
        inbound: Option<i64>,

        /// Case-insensitive part of the email.
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Apply a time and/or traffic rule to many clients.
    Bulk(BulkArgs),

    /// Edit one client.
    Client(ClientArgs),

    /// Restart the panel service.
    Restart,
}

#[derive(Args, Debug, Clone)]
pub struct CommitFlags {
    /// Show the planned changes without saving them.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Save without asking for confirmation.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BulkArgs {
    /// Only clients of this inbound (default: all inbounds).
    #[arg(short, long)]
    pub inbound: Option<i64>,

    /// Which clients get more time.
    #[arg(long, value_enum, default_value_t = TimeChoice::None)]
    pub time: TimeChoice,

    /// Days to add [default: from config].
    #[arg(long)]
    pub days: Option<i64>,

    /// Which clients get more traffic.
    #[arg(long, value_enum, default_value_t = TrafficChoice::None)]
    pub traffic: TrafficChoice,

    /// GB to add [default: from config].
    #[arg(long)]
    pub gb: Option<f64>,

    #[command(flatten)]
    pub flags: CommitFlags,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Client email.
    pub email: String,

    /// Inbound holding the client (required when the email is in several).
    #[arg(short, long)]
    pub inbound: Option<i64>,

    #[command(subcommand)]
    pub action: ClientAction,

    #[command(flatten)]
    pub flags: CommitFlags,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ClientAction {
    /// Push the expiry N days past the later of now and the current expiry.
    Extend { days: i64 },
    /// Expire N days from now.
    Reactivate { days: i64 },
    /// Raise the quota by G GB.
    AddQuota { gb: f64 },
    /// Zero the usage counters.
    ResetUsage,
    /// Overwrite expiry and/or quota (0 = unlimited).
    Set {
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        gb: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeChoice {
    None,
    All,
    Active,
    Expired,
}

impl From<TimeChoice> for TimeAxis {
    fn from(choice: TimeChoice) -> Self {
        match choice {
            TimeChoice::None => Self::None,
            TimeChoice::All => Self::All,
            TimeChoice::Active => Self::ActiveOnly,
            TimeChoice::Expired => Self::ExpiredOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrafficChoice {
    None,
    All,
    Depleted,
    NotDepleted,
}

impl From<TrafficChoice> for TrafficAxis {
    fn from(choice: TrafficChoice) -> Self {
        match choice {
            TrafficChoice::None => Self::None,
            TrafficChoice::All => Self::All,
            TrafficChoice::Depleted => Self::DepletedOnly,
            TrafficChoice::NotDepleted => Self::NotDepletedOnly,
        }
    }
}

impl BulkArgs {
    /// The scenario, with unset amounts taken from `config`.
    pub fn operation(&self, config: &Config) -> Operation {
        let time = TimeAxis::from(self.time);
        let traffic = TrafficAxis::from(self.traffic);
        let days = match time {
            TimeAxis::None => 0,
            _ => self.days.unwrap_or(config.defaults.days_to_add),
        };
        let gb = match traffic {
            TrafficAxis::None => 0.0,
            _ => self.gb.unwrap_or(config.defaults.gb_to_add),
        };
        Operation::Bulk(BulkScenario::new().time(time, days).traffic(traffic, gb))
    }

    pub fn scope(&self) -> Scope {
        self.inbound.map_or(Scope::AllInbounds, Scope::SingleInbound)
    }
}

impl ClientArgs {
    pub fn operation(&self) -> Operation {
        Operation::Manual(match self.action {
            ClientAction::Extend { days } => ManualAction::ExtendDays(days),
            ClientAction::Reactivate { days } => ManualAction::Reactivate(days),
            ClientAction::AddQuota { gb } => ManualAction::AddQuota(gb),
            ClientAction::ResetUsage => ManualAction::ResetUsage,
            ClientAction::Set { days, gb } => ManualAction::ManualSet { days, gb },
        })
    }

    pub fn scope(&self) -> Scope {
        Scope::client(self.email.clone(), self.inbound)
    }
}

/// Run xui-bulk with the given arguments.
pub async fn run(args: ManagerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_or_default(DEFAULT_CONFIG_FILE)?,
    };
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);

    let restarter = SystemRestarter::new(config.panel.service.clone());
    let command = args.command.unwrap_or(Command::Shell);
    let mut prompt = Prompt::new(io::stdin().lock(), io::stdout());

    if let Command::Restart = command {
        let ran = restarter.restart().await?;
        prompt.say(format_args!("Panel restarted ({ran})."))?;
        return Ok(());
    }

    let database = match resolve_database(config.database.path.as_deref()) {
        Ok(path) => path,
        Err(ConfigError::AmbiguousDatabase(found)) if matches!(command, Command::Shell) => {
            match pick_database(&mut prompt, &found)? {
                Some(path) => path,
                None => return Ok(()),
            }
        }
        Err(e) => return Err(e.into()),
    };
    info!(database = %database.display(), "opening panel database");
    let reconciler = Reconciler::new(open_store(&config, &database).await?);

    match command {
        Command::Shell => {
            let settings = ShellSettings {
                days_to_add: config.defaults.days_to_add,
                gb_to_add: config.defaults.gb_to_add,
                restart: config.panel.restart,
            };
            let mut shell = Shell::new(&reconciler, &restarter, prompt, settings).await?;
            shell.run().await?;
        }
        Command::Inbounds => {
            let snapshot = reconciler.load().await?;
            prompt.say(render::inbounds_table(&snapshot.records, false))?;
        }
        Command::Clients { inbound, search } => {
            let snapshot = reconciler.load().await?;
            let matches = render::find_clients(
                &snapshot.records,
                inbound,
                search.as_deref().unwrap_or(""),
            );
            if matches.is_empty() {
                prompt.say("No client found.")?;
            } else {
                prompt.say(render::clients_table(&matches, &snapshot.usage))?;
            }
        }
        Command::Bulk(bulk) => {
            let snapshot = reconciler.load().await?;
            let plan = snapshot.evaluate(&bulk.scope(), &bulk.operation(&config), now_millis())?;
            commit_plan(&reconciler, &plan, &bulk.flags, config.panel.restart, &restarter, &mut prompt)
                .await?;
        }
        Command::Client(client) => {
            let snapshot = reconciler.load().await?;
            let plan = snapshot.evaluate(&client.scope(), &client.operation(), now_millis())?;
            commit_plan(&reconciler, &plan, &client.flags, config.panel.restart, &restarter, &mut prompt)
                .await?;
        }
        Command::Restart => {}
    }
    Ok(())
}

/// Open the SQLite store described by `config`.
pub async fn open_store(config: &Config, database: &Path) -> Result<SqlitePanelStore, xui_store::StoreError> {
    let method = match config.backup.method {
        BackupMethodConfig::Vacuum => BackupMethod::Vacuum,
        BackupMethodConfig::Copy => BackupMethod::Copy,
    };
    let mut store_config = SqliteStoreConfig::new(database.to_string_lossy())
        .max_connections(config.database.max_connections)
        .busy_timeout(Duration::from_secs(config.database.busy_timeout_secs))
        .backup_method(method);
    if let Some(dir) = &config.backup.dir {
        store_config = store_config.backup_dir(dir);
    }
    SqlitePanelStore::connect(store_config).await
}

/// Let the user choose among several candidate databases.
pub fn pick_database<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    found: &[PathBuf],
) -> io::Result<Option<PathBuf>> {
    prompt.say("Several databases found:")?;
    for (i, path) in found.iter().enumerate() {
        prompt.say(format_args!("[{}] {}", i + 1, path.display()))?;
    }
    Ok(match prompt.ask_choice("Database (0 exit)", found.len(), 0)? {
        Some(n) if n > 0 => Some(found[n - 1].clone()),
        _ => None,
    })
}

/// Preview `plan`, then save it unless this is a dry run or the user says no.
pub async fn commit_plan<S, R, W>(
    reconciler: &Reconciler<S>,
    plan: &PlannedChange,
    flags: &CommitFlags,
    restart: RestartPolicy,
    restarter: &dyn PanelRestarter,
    prompt: &mut Prompt<R, W>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: PanelStore,
    R: BufRead,
    W: Write,
{
    if plan.is_empty() {
        prompt.say("Nothing to change.")?;
        return Ok(());
    }
    prompt.say(render::changes_table(plan))?;
    prompt.say(render::plan_summary(plan))?;
    if flags.dry_run {
        prompt.say("Dry run, nothing saved.")?;
        return Ok(());
    }
    if !flags.yes && prompt.confirm("Save to the database?", false)? != Some(true) {
        prompt.say("Aborted.")?;
        return Ok(());
    }

    let summary = reconciler.apply(plan).await?;
    prompt.say(render::apply_summary(&summary))?;

    // unattended runs never block on the restart question
    let restart = match (restart, flags.yes) {
        (RestartPolicy::Ask, true) => RestartPolicy::Never,
        (policy, _) => policy,
    };
    offer_restart(prompt, restart, restarter).await?;
    Ok(())
}
