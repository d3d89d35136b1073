//! Privacore - Privacy masking and compliance engine
//!
//! Command-line entry point: scan content for sensitive data, generate
//! compliance reports and run retention sweeps against the local state
//! directory.

use anyhow::Result;
use clap::{Parser, Subcommand};
use privacore::{
    compliance::{
        ComplianceCenter, MessageStore, MetricStore, PolicyStore, RequestStore, RetentionStore,
    },
    config::{load_keyring, PrivacoreConfig},
    masking::{DetectionLog, IdentityVault, IncidentStore, MaskingEngine, ProfileStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "privacore")]
#[command(version)]
#[command(about = "Privacy masking and compliance engine")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PRIVACORE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mask sensitive data in content
    Scan {
        /// User whose privacy settings apply
        #[arg(short, long)]
        user: String,

        /// Content to scan; stdin is read when neither --text nor --file is
        /// given
        #[arg(short, long)]
        text: Option<String>,

        /// File to scan
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Generate a compliance report
    Report {
        /// Window length in days
        #[arg(long, default_value = "30")]
        days: i64,

        /// Restrict DLP figures to one department
        #[arg(long)]
        department: Option<String>,
    },

    /// Run the retention sweep and expire stale unmasking requests
    Sweep,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("privacore={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if let Some(config_path) = cli.config {
        let content = std::fs::read_to_string(&config_path)?;
        toml::from_str(&content)?
    } else {
        PrivacoreConfig::default()
    };

    match cli.command {
        Commands::Scan { user, text, file } => {
            run_scan(&config, &user, text, file).await?;
        }
        Commands::Report { days, department } => {
            run_report(&config, days, department.as_deref()).await?;
        }
        Commands::Sweep => {
            run_sweep(&config).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

struct Engines {
    masking: MaskingEngine,
    compliance: ComplianceCenter,
}

/// Wire both engines onto the state directory, sharing the key ring, the
/// incident store and the detection log
async fn build_engines(config: &PrivacoreConfig) -> Result<Engines> {
    let keyring = Arc::new(load_keyring(&config.encryption)?);
    tracing::debug!(
        key = %keyring.active_fingerprint(),
        version = keyring.active_version(),
        "key ring loaded"
    );
    let state = &config.storage.state_dir;

    let profiles = Arc::new(ProfileStore::open(Some(state.join("profiles"))).await?);
    let detections = Arc::new(DetectionLog::open(Some(state.join("detections"))).await?);
    let vault = Arc::new(IdentityVault::open(Some(state.join("identities"))).await?);
    let incidents = Arc::new(IncidentStore::open(Some(state.join("incidents"))).await?);

    let masking = MaskingEngine::new(
        keyring,
        profiles,
        Arc::clone(&detections),
        vault,
        Arc::clone(&incidents),
        config.masking.clone(),
        config.dlp.clone(),
    )?;

    let policies = Arc::new(PolicyStore::open(Some(state.join("policies"))).await?);
    let retention = Arc::new(
        RetentionStore::open(
            Some(state.join("retention_policies")),
            Some(state.join("retention_notifications")),
        )
        .await?,
    );
    let requests = Arc::new(RequestStore::open(Some(state.join("requests"))).await?);
    let metrics = Arc::new(MetricStore::open(Some(state.join("metrics"))).await?);
    let messages = Arc::new(MessageStore::open(Some(state.join("messages"))).await?);

    let compliance = ComplianceCenter::new(
        policies,
        retention,
        requests,
        metrics,
        messages,
        incidents,
        detections,
        config.compliance.clone(),
    );

    Ok(Engines {
        masking,
        compliance,
    })
}

async fn run_scan(
    config: &PrivacoreConfig,
    user: &str,
    text: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let content = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => std::io::read_to_string(std::io::stdin())?,
    };

    let engines = build_engines(config).await?;
    let result = engines.masking.mask_content(&content, user, None).await?;

    // Masked content on stdout, detection summary on stderr
    println!("{}", result.masked_content);

    if result.detections.is_empty() {
        eprintln!("No sensitive data detected");
        return Ok(());
    }

    eprintln!();
    eprintln!("Detections (risk score {:.1}):", result.risk_score);
    for detection in &result.detections {
        eprintln!(
            "  {:>4}  {} ({}%) -> {}",
            detection.position, detection.data_type, detection.confidence, detection.masked_value
        );
    }

    Ok(())
}

async fn run_report(config: &PrivacoreConfig, days: i64, department: Option<&str>) -> Result<()> {
    let engines = build_engines(config).await?;

    let end = chrono::Utc::now();
    let start = end - chrono::Duration::days(days);
    let report = engines
        .compliance
        .generate_compliance_report(start, end, department)
        .await;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_sweep(config: &PrivacoreConfig) -> Result<()> {
    let engines = build_engines(config).await?;

    let created = engines.compliance.check_retention_compliance().await?;
    let expired = engines.compliance.expire_stale_requests().await?;

    println!("Retention notifications created: {}", created);
    println!("Unmasking requests expired: {}", expired);
    Ok(())
}

fn show_config(config: Option<&PrivacoreConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
