mod catalog_commands;
mod config_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::{Context, bail},
    clap::{Parser, Subcommand},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    studybot_channels::ChannelOutbound,
    studybot_config::{Severity, StudybotConfig},
    studybot_consultant::{ConsultantService, Degree, Field, SessionStore},
    studybot_handoff::{HandoffCoordinator, LeadContext},
    studybot_providers::OpenAiCompatProvider,
    studybot_telegram::TelegramOutbound,
};

#[derive(Parser)]
#[command(name = "studybot", about = "Study-abroad consultant bot for Telegram", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (overrides discovery in ./ and ~/.config/studybot/).
    #[arg(long, global = true, env = "STUDYBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default when no subcommand is provided).
    Run,
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Search the program catalog.
    Programs {
        #[arg(long)]
        degree: Option<Degree>,
        /// Repeatable: it, ai, data-science, business.
        #[arg(long = "field")]
        fields: Vec<Field>,
        /// Maximum tuition in euro per year.
        #[arg(long)]
        budget: Option<u32>,
        #[arg(long)]
        country: Option<String>,
        /// List every match instead of the top results the bot would show.
        #[arg(long)]
        all: bool,
    },
    /// Write a documented default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Load the explicit `--config` file, or discover one.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<(StudybotConfig, Option<PathBuf>)> {
    match path {
        Some(path) => {
            let mut config = studybot_config::load_config(path)?;
            studybot_config::apply_env_overrides(&mut config);
            Ok((config, Some(path.clone())))
        },
        None => Ok((
            studybot_config::discover_and_load(),
            studybot_config::find_config_file(),
        )),
    }
}

async fn run(config: StudybotConfig) -> anyhow::Result<()> {
    let report = studybot_config::validate(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        bail!("configuration has errors, run `studybot check` for details");
    }

    let poll_timeout = config.telegram.poll_timeout_secs;
    let bot = studybot_telegram::build_bot(&config.telegram.token, poll_timeout)?;
    let outbound: Arc<dyn ChannelOutbound> = Arc::new(TelegramOutbound::new(bot.clone()));

    let sessions = Arc::new(SessionStore::new());
    let leads: Arc<dyn LeadContext> = Arc::clone(&sessions) as Arc<dyn LeadContext>;
    let handoff = Arc::new(
        HandoffCoordinator::from_config(&config.handoff, Arc::clone(&outbound), leads)
            .context("invalid hand-off configuration")?,
    );

    let mut service = ConsultantService::new(
        sessions,
        Arc::clone(&handoff),
        outbound,
        config.leads.clone(),
    );
    match OpenAiCompatProvider::from_config(&config.llm) {
        Ok(provider) => {
            info!(model = %config.llm.model, "llm answers enabled");
            service = service.with_llm(Arc::new(provider));
        },
        Err(e) => warn!(error = %e, "llm answers disabled"),
    }

    let cancel = CancellationToken::new();
    let polling =
        studybot_telegram::start_polling(bot, poll_timeout, Arc::new(service), cancel.clone())
            .await
            .context("failed to connect to telegram")?;
    handoff.start();
    info!(
        operators = config.handoff.operators.len(),
        "studybot running, press Ctrl-C to stop"
    );

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            info!("shutdown requested");
        },
        () = cancel.cancelled() => warn!("telegram polling stopped, shutting down"),
    }

    cancel.cancel();
    if let Err(e) = polling.await {
        warn!(error = %e, "polling task ended abnormally");
    }
    handoff.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "studybot starting");
            let (config, _) = load_config(cli.config.as_ref())?;
            run(config).await
        },
        Some(Commands::Check) => {
            let (config, source) = load_config(cli.config.as_ref())?;
            config_commands::check(&config, source.as_deref())
        },
        Some(Commands::Programs {
            degree,
            fields,
            budget,
            country,
            all,
        }) => {
            let filter = catalog_commands::filter(degree, fields, budget, country);
            print!("{}", catalog_commands::render_programs(&filter, all));
            Ok(())
        },
        Some(Commands::Init { force }) => {
            let path = match cli.config {
                Some(path) => path,
                None => config_commands::default_config_path()?,
            };
            config_commands::init(&path, force)?;
            println!("Wrote {}", path.display());
            Ok(())
        },
    }
}
