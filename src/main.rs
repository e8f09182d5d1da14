use clap::Parser;
use locator_healing::cli::commands::{cmd_corpus, cmd_find, cmd_heal, cmd_record};
use locator_healing::cli::config::{Cli, Commands};
use locator_healing::config::settings::load_settings;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings(cli.config.as_deref());

    match cli.command {
        Commands::Heal {
            page,
            locator,
            tuning,
        } => {
            if !cmd_heal(&settings, &page, &locator, &tuning)? {
                std::process::exit(1);
            }
        }
        Commands::Record { page, locator } => {
            cmd_record(&settings, &page, &locator)?;
        }
        Commands::Find {
            url,
            locator,
            heal,
            tuning,
        } => {
            if !cmd_find(&settings, &url, &locator, heal, &tuning)? {
                std::process::exit(1);
            }
        }
        Commands::Corpus => {
            cmd_corpus(&settings)?;
        }
    }

    Ok(())
}

/// Logs go to stderr. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
