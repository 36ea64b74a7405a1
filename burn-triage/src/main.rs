use burn_triage::classify_processing::run_classification;
use burn_triage::color_utils::{colors, init_color_config, symbols};
use burn_triage::config::{ClassifyCommand, ClassifyConfig, GlobalArgs};
use burn_triage::decision_types::EngineConfig;
use clap::Parser;
use env_logger::{Builder, Env};
use log::{error, info, Level};
use std::io::Write;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Classify burn severity in images, rejecting anything that is not a clear burn
    Classify(ClassifyCommand),

    /// Print the default decision thresholds as TOML
    Thresholds,

    /// Show version information
    Version,
}

#[derive(Parser)]
#[command(name = "burn-triage")]
#[command(about = "Burn severity classification with open-set rejection")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

fn get_log_level_from_verbosity(
    verbosity: clap_verbosity_flag::Verbosity<clap_verbosity_flag::ErrorLevel>,
) -> log::LevelFilter {
    // clap-verbosity-flag can't tell default from -q, so check quiet directly
    if verbosity.is_silent() {
        return log::LevelFilter::Error; // -q -> ERROR
    }
    match verbosity.log_level_filter() {
        log::LevelFilter::Off => log::LevelFilter::Off, // -qq -> OFF
        log::LevelFilter::Error => log::LevelFilter::Warn, // default -> WARN
        log::LevelFilter::Warn => log::LevelFilter::Info, // -v -> INFO
        log::LevelFilter::Info => log::LevelFilter::Debug, // -vv -> DEBUG
        log::LevelFilter::Debug | log::LevelFilter::Trace => log::LevelFilter::Trace,
    }
}

fn init_logger(global: &GlobalArgs) {
    // If user didn't pass -v/-q and RUST_LOG is set, honor the env var.
    let use_env = !global.verbosity.is_present() && std::env::var_os("RUST_LOG").is_some();

    let mut logger = if use_env {
        Builder::from_env(Env::default())
    } else {
        let mut b = Builder::new();
        b.filter_level(get_log_level_from_verbosity(global.verbosity.clone()));
        b
    };

    logger
        .format(|buf, record| {
            let level_str = match record.level() {
                Level::Error => colors::error_level("ERROR"),
                Level::Warn => colors::warning_level("WARN"),
                Level::Info => colors::info_level("INFO"),
                Level::Debug => colors::debug_level("DEBUG"),
                Level::Trace => colors::trace_level("TRACE"),
            };
            writeln!(buf, "[{}] {}", level_str, record.args())
        })
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_color_config(cli.global.no_color);
    init_logger(&cli.global);

    match cli.command {
        Some(Commands::Classify(classify_cmd)) => {
            let sources_desc = if classify_cmd.sources.len() == 1 {
                classify_cmd.sources[0].clone()
            } else {
                format!("{} inputs", classify_cmd.sources.len())
            };
            info!(
                "{} Burn classification: {} | device: {}",
                symbols::classify_start(),
                sources_desc,
                cli.global.device
            );

            let config = match ClassifyConfig::from_args(cli.global.clone(), classify_cmd) {
                Ok(config) => config,
                Err(e) => {
                    error!("{} Invalid configuration: {e}", symbols::operation_failed());
                    std::process::exit(1);
                }
            };
            if let Err(e) = run_classification(config) {
                error!("{} Classification failed: {e:#}", symbols::operation_failed());
                std::process::exit(1);
            }
        }
        Some(Commands::Thresholds) => match EngineConfig::default().to_toml_string() {
            Ok(text) => print!("{text}"),
            Err(e) => {
                error!("{} {e}", symbols::operation_failed());
                std::process::exit(1);
            }
        },
        Some(Commands::Version) => {
            println!("burn-triage v{}", env!("CARGO_PKG_VERSION"));
        }
        None => {
            use clap::CommandFactory;
            let mut cmd = Cli::command();
            if cmd.print_help().is_err() {
                std::process::exit(2);
            }
            println!();
        }
    }
}
