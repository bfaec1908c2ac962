use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use manimatic_app_core::SettingsStore;
use manimatic_cli::commands::{self, CompileOptions, GenerateOptions};
use manimatic_cli::ConfigKey;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Backend base URL (overrides settings and MANIMATIC_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Seconds to wait for the first event after a request
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Directory holding settings.json instead of the platform default
    #[arg(long, global = true)]
    config_dir: Option<Utf8PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the backend is reachable
    Health,
    /// List the backend's feature flags
    Features,
    /// List the models available for generation
    Models,
    /// Generate an animation script from a prompt and wait for its video
    Generate {
        prompt: String,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(long, help = "Stop once the script has arrived")]
        no_video: bool,
        #[arg(long, help = "Write the script to this file instead of stdout")]
        script_out: Option<Utf8PathBuf>,
        #[arg(short, long, help = "Download the rendered video to this path")]
        download: Option<Utf8PathBuf>,
        #[arg(long, default_value_t = manimatic_config::DEFAULT_RENDER_TIMEOUT_SECS)]
        render_timeout_secs: u64,
    },
    /// Compile an edited script into a video
    Compile {
        script: Utf8PathBuf,
        #[arg(short, long, help = "Download the rendered video to this path")]
        download: Option<Utf8PathBuf>,
    },
    /// Show or change persisted settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    Show,
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = match &cli.config_dir {
        Some(dir) => SettingsStore::at(dir.as_std_path()),
        None => SettingsStore::new(),
    };

    let mut settings = store.load()?.with_env_overrides();
    if let Some(url) = cli.base_url {
        settings.api_base_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        settings.generation_timeout_ms = secs.saturating_mul(1_000);
    }

    match cli.command {
        Commands::Health => commands::cmd_health(&settings).await?,
        Commands::Features => {
            commands::cmd_features(&settings).await?;
        }
        Commands::Models => {
            commands::cmd_models(&settings).await?;
        }
        Commands::Generate {
            prompt,
            model,
            no_video,
            script_out,
            download,
            render_timeout_secs,
        } => {
            let opts = GenerateOptions {
                model,
                no_video,
                script_out,
                download,
                render_timeout: Duration::from_secs(render_timeout_secs),
                ..GenerateOptions::new(prompt)
            };
            commands::cmd_generate(&settings, opts).await?;
        }
        Commands::Compile { script, download } => {
            commands::cmd_compile(&settings, &script, CompileOptions { download }).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                commands::cmd_config_show(&store)?;
            }
            ConfigCommands::Set { key, value } => {
                commands::cmd_config_set(&store, key, &value)?;
            }
        },
    }

    Ok(())
}
