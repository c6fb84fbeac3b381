use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use tk_config::{report_unused_keys, resolve_secrets, KeeperConfig, ProcessRole, UnusedKeyPolicy};
use tk_db::{PgHandStore, PgOutboxPublisher};
use tk_gateway::HttpEscrowGateway;
use tk_reconcile::Reconciler;

#[derive(Parser)]
#[command(name = "tk")]
#[command(about = "TableKeeper operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Run one reconciliation pass over every registered table and print the report
    Scan {
        /// Config layers in merge order. Built-in defaults when omitted.
        #[arg(long = "config", num_args = 1..)]
        config_paths: Vec<String>,

        /// Evaluate at this unix timestamp instead of the wall clock
        #[arg(long)]
        now: Option<i64>,
    },

    /// Reconcile a single table and print what was decided and published
    Reconcile {
        /// Table contract address
        #[arg(long)]
        table: String,

        #[arg(long = "config", num_args = 1..)]
        config_paths: Vec<String>,

        #[arg(long)]
        now: Option<i64>,
    },

    /// Show the most recent control events enqueued for a table
    Outbox {
        #[arg(long)]
        table: String,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = tk_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = tk_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_hands_table={} has_outbox_table={}",
                        s.ok, s.has_hands_table, s.has_outbox_table
                    );
                }
                DbCmd::Migrate => {
                    tk_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Scan { config_paths, now } => {
            let reconciler = build_reconciler(&config_paths).await?;
            let report = match now {
                Some(ts) => reconciler.scan_at(ts).await?,
                None => reconciler.scan().await?,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.error_count() > 0 {
                anyhow::bail!("{} table(s) failed to reconcile", report.error_count());
            }
        }

        Commands::Reconcile {
            table,
            config_paths,
            now,
        } => {
            let reconciler = build_reconciler(&config_paths).await?;
            let rec = match now {
                Some(ts) => reconciler.reconcile_table_at(&table, ts).await?,
                None => reconciler.reconcile_table(&table).await?,
            };
            println!("{}", serde_json::to_string_pretty(&rec)?);
        }

        Commands::Outbox { table, limit } => {
            let pool = tk_db::connect_from_env().await?;
            let total = tk_db::outbox_count(&pool, &table).await?;
            let rows = tk_db::outbox_recent(&pool, &table, limit.max(1)).await?;
            println!("table={} total={} showing={}", table, total, rows.len());
            for r in rows {
                println!(
                    "{} {} {} {}",
                    r.ts_utc.to_rfc3339(),
                    r.event_id,
                    r.subject,
                    r.payload
                );
            }
        }
    }

    Ok(())
}

fn load_config(paths: &[String]) -> Result<KeeperConfig> {
    if paths.is_empty() {
        return Ok(KeeperConfig::default());
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = tk_config::load_layered_yaml(&path_refs)?;
    let report = report_unused_keys(ProcessRole::Cli, &loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_keys {
        tracing::warn!(pointer = %ptr, "unused config key");
    }
    loaded.keeper()
}

/// Gateway-backed reconciler publishing into the durable outbox.
async fn build_reconciler(config_paths: &[String]) -> Result<Reconciler> {
    let mut cfg = load_config(config_paths)?;
    if let Ok(url) = std::env::var("TK_GATEWAY_URL") {
        cfg.gateway.base_url = url;
    }
    let secrets = resolve_secrets(&cfg, ProcessRole::Cli)?;

    let pool = tk_db::connect(&secrets.database_url, cfg.db.max_connections)
        .await
        .context("connect for reconcile failed")?;
    let gateway = Arc::new(HttpEscrowGateway::new(&cfg.gateway, secrets.gateway_api_key.clone())?);

    Ok(Reconciler::new(
        gateway.clone(),
        gateway,
        Arc::new(PgHandStore::new(pool.clone())),
        Arc::new(PgOutboxPublisher::new(pool)),
        cfg.reconcile.thresholds,
    ))
}
