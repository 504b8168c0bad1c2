//! pkmeter command line
//!
//! Usage:
//!   pkmeter conkyrc                 → write ~/.conkyrc and <root>/config.lua
//!   pkmeter update <widget>         → refresh a widget's cache if it is due
//!   pkmeter get -ir0 system.cpu     → print one cached value (for conky)
//!   pkmeter widgets                 → list widget types

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use pkmeter::query::{self, QueryOptions};
use pkmeter::update::run_update;
use pkmeter::{layout, logging, Config, Paths, Theme, WidgetRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "pkmeter",
    about = "Conky overlay generator with cached widget data",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.json / config.toml and images
    #[arg(long, global = true, env = "PKMETER_ROOT")]
    root: Option<PathBuf>,

    /// Directory holding the per-widget cache documents
    #[arg(long, global = true, env = "PKMETER_CACHE")]
    cache: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the conkyrc and the drawing configuration
    Conkyrc {
        /// Where to write the conkyrc (default: ~/.conkyrc)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Where to write the drawing configuration (default: <root>/config.lua)
        #[arg(short, long)]
        lua: Option<PathBuf>,
    },
    /// Print a cached value: <widget>.<dotted.path>
    Get {
        key: String,
        /// Printed when the value is missing or cannot be formatted
        #[arg(short, long, default_value = "", allow_hyphen_values = true)]
        default: String,
        /// Cast the value to an integer
        #[arg(short, long)]
        int: bool,
        /// Round to this many decimal places
        #[arg(short, long, value_name = "PLACES")]
        round: Option<String>,
        /// strftime format, treating the value as a Unix timestamp
        #[arg(short, long)]
        format: Option<String>,
    },
    /// Refresh a widget's cache
    Update {
        widget: String,
        /// Ignore the cache age
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// List the available widget types
    Widgets,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Commands::Get { key, default, int, round, format } = cli.command {
        logging::init_quiet();
        // parsed here so a malformed place count still prints the default
        let round = match round.map(|places| places.parse::<u32>()).transpose() {
            Ok(round) => round,
            Err(e) => {
                warn!("Invalid --round value: {}", e);
                println!("{default}");
                return ExitCode::SUCCESS;
            }
        };
        let opts = QueryOptions { default, int, round, format };
        let value = match Paths::resolve(cli.root, cli.cache) {
            Ok(paths) => query::get_value(&paths.cache, &key, &opts),
            Err(_) => opts.default.clone(),
        };
        println!("{value}");
        return ExitCode::SUCCESS;
    }

    let registry = WidgetRegistry::builtin();
    if let Commands::Widgets = cli.command {
        for kind in registry.kinds() {
            println!("{kind}");
        }
        return ExitCode::SUCCESS;
    }

    let paths = match Paths::resolve(cli.root, cli.cache) {
        Ok(paths) => paths,
        Err(e) => {
            logging::init_quiet();
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let config = match Config::load(&paths.root) {
        Ok(config) => config,
        Err(e) => {
            logging::init(None, &paths);
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let _guard = logging::init(Some(&config), &paths);

    let result = match cli.command {
        Commands::Conkyrc { output, lua } => generate(&config, &registry, &paths, output, lua),
        Commands::Update { widget, force } => run_update(&widget, &config, &registry, &paths, force)
            .await
            .map(|outcome| info!("{}: {:?}", widget, outcome))
            .map_err(anyhow::Error::from),
        Commands::Get { .. } | Commands::Widgets => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn generate(
    config: &Config,
    registry: &WidgetRegistry,
    paths: &Paths,
    output: Option<PathBuf>,
    lua: Option<PathBuf>,
) -> Result<()> {
    let output = match output {
        Some(output) => output,
        None => dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .join(".conkyrc"),
    };
    let lua = lua.unwrap_or_else(|| paths.root.join("config.lua"));

    let theme = Theme::derive(config)?;
    let layout = layout::compose(config, &theme, registry, paths)?;
    layout::write_artifacts(&layout, &output, &lua)
}
