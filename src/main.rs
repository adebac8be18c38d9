use std::fs;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result};
use birthday_progress::card::{self, CardConfig, Layout, ProgressType, Theme};
use birthday_progress::config::{Config, DEFAULT_CONFIG_PATH};
use birthday_progress::logger;
use birthday_progress::registration::display_date;
use birthday_progress::scheduler::ManualClock;
use birthday_progress::sensor::{SensorState, entity_id_for};
use birthday_progress::{
    BirthEdit, BirthdayStore, Clock, JsonFileStore, RegistrationForm, Scheduler, SystemClock,
};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "birthday-progress")]
#[command(about = "Track progress toward the next birthday")]
struct Cli {
    /// TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Registrations file; overrides `storage.path` from the config
    #[arg(long)]
    storage: Option<PathBuf>,

    #[arg(long, short, help = "Enable verbose output")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a birthday
    Add {
        #[arg(long)]
        name: String,
        /// DD.MM.YYYY or YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// HH:MM or HH:MM:SS
        #[arg(long)]
        time: Option<String>,
    },
    /// Replace the birth date/time of a registration
    Edit {
        id: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        time: Option<String>,
    },
    /// Remove a registration
    Remove { id: String },
    /// List registrations
    List,
    /// Print the published sensor state(s) as JSON
    Show {
        id: Option<String>,
        /// Evaluate at this local instant (YYYY-MM-DDTHH:MM:SS) instead of now
        #[arg(long, value_parser = parse_instant)]
        at: Option<NaiveDateTime>,
    },
    /// Render a card as SVG
    Card {
        /// Entity id, e.g. sensor.anna_birthday_progress
        #[arg(long)]
        entity: String,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_enum)]
        progress_type: Option<ProgressArg>,
        #[arg(long)]
        next_birthday_title: Option<String>,
        #[arg(long, value_enum)]
        layout: Option<LayoutArg>,
        #[arg(long, value_enum)]
        theme: Option<ThemeArg>,
        #[arg(long, value_parser = parse_instant)]
        at: Option<NaiveDateTime>,
    },
    /// Update every sensor once per interval until Ctrl-C
    Run {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProgressArg {
    Circular,
    Horizontal,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Progress,
    Panels,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeArg {
    Dark,
    Light,
}

impl From<ProgressArg> for ProgressType {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Circular => ProgressType::Circular,
            ProgressArg::Horizontal => ProgressType::Horizontal,
        }
    }
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Progress => Layout::Progress,
            LayoutArg::Panels => Layout::Panels,
        }
    }
}

impl From<ThemeArg> for Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Light => Theme::Light,
        }
    }
}

fn parse_instant(s: &str) -> std::result::Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM:SS: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    logger::init_cli_logger(cli.verbose, config.logging.level.as_deref());

    let storage = cli.storage.clone().unwrap_or_else(|| config.storage.path.clone());
    let mut store = JsonFileStore::open(&storage)
        .with_context(|| format!("Failed to open registrations {}", storage.display()))?;
    let today = SystemClock.now().date();

    match cli.command {
        Command::Add { name, date, time } => {
            let form = RegistrationForm {
                name,
                birth_date: date,
                birth_time: time,
            };
            let reg = store.register(&form, today).context("Registration rejected")?;
            println!("Registered {} as {}", reg.name, reg.id);
        }
        Command::Edit { id, date, time } => {
            let edit = BirthEdit {
                birth_date: date,
                birth_time: time,
            };
            let reg = store.update(&id, &edit, today).context("Edit rejected")?;
            println!("Updated {}", reg.name);
        }
        Command::Remove { id } => {
            let reg = store.remove(&id)?;
            println!("Removed {}", reg.name);
        }
        Command::List => {
            for reg in store.list() {
                let time = reg
                    .birth
                    .time()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}\t{}", reg.id, reg.name, display_date(reg.birth.date()), time);
            }
        }
        Command::Show { id, at } => {
            let clock = ManualClock::new(at.unwrap_or_else(|| SystemClock.now()));
            let mut scheduler = Scheduler::new(store, clock, config.scheduler.period());
            scheduler.tick();

            let states: Vec<&SensorState> = match &id {
                Some(id) => {
                    let entity_id = entity_id_for(&scheduler.store().get(id)?.id);
                    scheduler.board().get(&entity_id).into_iter().collect()
                }
                None => scheduler.board().iter().collect(),
            };
            println!("{}", serde_json::to_string_pretty(&states)?);
        }
        Command::Card {
            entity,
            out,
            name,
            progress_type,
            next_birthday_title,
            layout,
            theme,
            at,
        } => {
            let mut card_config = config
                .card(&entity)
                .cloned()
                .unwrap_or_else(|| CardConfig::for_entity(entity.clone()));
            if name.is_some() {
                card_config.name = name;
            }
            if next_birthday_title.is_some() {
                card_config.next_birthday_title = next_birthday_title;
            }
            if let Some(p) = progress_type {
                card_config.progress_type = p.into();
            }
            if let Some(l) = layout {
                card_config.layout = l.into();
            }
            if let Some(t) = theme {
                card_config.theme = t.into();
            }
            card_config.validate()?;

            let clock = ManualClock::new(at.unwrap_or_else(|| SystemClock.now()));
            let mut scheduler = Scheduler::new(store, clock, config.scheduler.period());
            scheduler.tick();

            let svg = card::render(&card_config, scheduler.board());
            fs::write(&out, svg).with_context(|| format!("Failed to write {}", out.display()))?;
            println!("Generated {} successfully.", out.display());
        }
        Command::Run { ticks } => {
            let mut scheduler = Scheduler::new(store, SystemClock, config.scheduler.period());
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            let mut seen = 0u64;
            scheduler
                .run_until(shutdown, |board| {
                    for state in board.iter() {
                        match state.state {
                            Some(p) => println!("{}\t{p:.4}%", state.entity_id),
                            None => println!("{}\tunavailable", state.entity_id),
                        }
                    }
                    seen += 1;
                    if ticks.is_some_and(|limit| seen >= limit) {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                })
                .await;
        }
    }

    Ok(())
}
