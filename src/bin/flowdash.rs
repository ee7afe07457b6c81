use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};

use flowdash::aging::{parse_threshold, resolve_thresholds};
use flowdash::storage::repository;
use flowdash::{AgingThresholdConfig, ThresholdStore, TimeGranularity};

#[derive(Parser)]
#[command(name = "flowdash", about = "Flow metrics and aging alerts for issue exports")]
struct Cli {
    /// Settings database path (default: ~/.flowdash/flowdash.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lead time, cumulative flow and age distribution for an issue export
    Metrics {
        /// Path to an issues JSONL export
        #[arg(long)]
        issues: String,
        /// Bucket width: hourly, 4-hourly, 8-hourly, daily (default: stored setting)
        #[arg(long)]
        granularity: Option<String>,
        /// Evaluate as of this RFC 3339 time instead of now
        #[arg(long)]
        now: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List open issues past their aging thresholds
    Aging {
        /// Path to an issues JSONL export
        #[arg(long)]
        issues: String,
        /// Show at most this many issues
        #[arg(long, default_value = "10")]
        top: usize,
        /// Evaluate as of this RFC 3339 time instead of now
        #[arg(long)]
        now: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage aging thresholds
    Thresholds {
        #[command(subcommand)]
        action: ThresholdAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ThresholdAction {
    /// Show the stored threshold config
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set manual thresholds (e.g. 48h, 3d)
    Set {
        /// Warning threshold, e.g. 48h
        #[arg(long)]
        warning: String,
        /// Critical threshold, e.g. 7d
        #[arg(long)]
        critical: String,
    },
    /// Turn percentile-based thresholds on or off
    Auto {
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        #[arg(long)]
        disable: bool,
        /// Warning percentile as a fraction (e.g. 0.75)
        #[arg(long)]
        warning_percentile: Option<f64>,
        /// Critical percentile as a fraction (e.g. 0.95)
        #[arg(long)]
        critical_percentile: Option<f64>,
    },
    /// Show the thresholds the stored config resolves to for an issue export
    Calibrate {
        /// Path to an issues JSONL export
        #[arg(long)]
        issues: String,
        /// Evaluate as of this RFC 3339 time instead of now
        #[arg(long)]
        now: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Restore the default thresholds
    Reset,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// Remove a config value
    Unset { key: String },
    /// List all config values
    List,
}

fn parse_now(now: Option<&str>) -> anyhow::Result<DateTime<Local>> {
    match now {
        Some(s) => flowdash::date_util::parse_local_instant(s)
            .ok_or_else(|| anyhow::anyhow!("invalid --now value {s:?}, expected RFC 3339")),
        None => Ok(Local::now()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => flowdash::Database::open_at(path).await?,
        None => flowdash::Database::open().await?,
    };

    match cli.command {
        Commands::Metrics {
            issues,
            granularity,
            now,
            json,
        } => {
            let granularity = resolve_granularity(&db, granularity.as_deref()).await?;
            let now = parse_now(now.as_deref())?;
            handle_metrics(&issues, granularity, &now, json)?;
        }
        Commands::Aging {
            issues,
            top,
            now,
            json,
        } => {
            let now = parse_now(now.as_deref())?;
            let config = load_thresholds(&db).await?;
            handle_aging(&issues, &config, now.with_timezone(&Utc), top, json)?;
        }
        Commands::Thresholds { action } => {
            handle_thresholds(&db, action).await?;
        }
        Commands::Config { action } => {
            handle_config(&db, action).await?;
        }
    }

    Ok(())
}

async fn resolve_granularity(
    db: &flowdash::Database,
    flag: Option<&str>,
) -> anyhow::Result<TimeGranularity> {
    if let Some(g) = flag {
        return Ok(TimeGranularity::parse(g)?);
    }
    let stored = db
        .call(|conn| repository::get_config(conn, repository::KEY_GRANULARITY))
        .await?;
    match stored {
        Some(g) => Ok(TimeGranularity::parse(&g)?),
        None => Ok(TimeGranularity::default()),
    }
}

async fn load_thresholds(db: &flowdash::Database) -> anyhow::Result<AgingThresholdConfig> {
    Ok(db.call(|conn| conn.load_threshold_config()).await?)
}

async fn save_thresholds(
    db: &flowdash::Database,
    config: AgingThresholdConfig,
) -> anyhow::Result<()> {
    config.validate()?;
    db.call(move |conn| conn.save_threshold_config(&config)).await?;
    Ok(())
}

fn handle_metrics(
    path: &str,
    granularity: TimeGranularity,
    now: &DateTime<Local>,
    json: bool,
) -> anyhow::Result<()> {
    let issues = flowdash::issue::load_jsonl(path)?;
    let Some(m) = flowdash::calculate_metrics(&issues, now, granularity) else {
        println!("No issues found in {path}.");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&m)?);
        return Ok(());
    }

    println!("Flow Metrics ({})", m.granularity);
    println!("  Open issues:  {}", m.open_count);
    println!("  Average age:  {}", m.average_age.display);
    println!("  Cycle time:");
    match (m.cycle_time_p50_hours, m.cycle_time_p85_hours) {
        (Some(p50), Some(p85)) => {
            let unit = m.average_age.unit;
            println!("    P50: {}", flowdash::date_util::format_duration(p50, unit));
            println!("    P85: {}", flowdash::date_util::format_duration(p85, unit));
            println!("    Closed samples: {}", m.lead_time.len());
        }
        _ => println!("    No closed issues yet"),
    }
    println!("  Age distribution:");
    for bucket in &m.age_distribution {
        println!("    {:<7} {}", bucket.label, bucket.count);
    }
    println!("  Cumulative flow (last 10 buckets):");
    let skip = m.flow.len().saturating_sub(10);
    for point in m.flow.iter().skip(skip) {
        println!(
            "    {:<14} opened {:>4}  closed {:>4}  open {:>4}  throughput {:>3}",
            point.label,
            point.cumulative_opened,
            point.cumulative_closed,
            point.open,
            point.throughput
        );
    }
    Ok(())
}

fn handle_aging(
    path: &str,
    config: &AgingThresholdConfig,
    now: DateTime<Utc>,
    top: usize,
    json: bool,
) -> anyhow::Result<()> {
    let issues = flowdash::issue::load_jsonl(path)?;
    let aging = flowdash::get_aging_issues(&issues, config, now);
    let counts = flowdash::count_issues_by_aging_status(&issues, config, now);

    if json {
        let shown: Vec<_> = aging.iter().take(top).collect();
        let out = serde_json::json!({
            "counts": counts,
            "issues": shown,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!(
        "Aging: {} critical, {} warning",
        counts.critical_count, counts.warning_count
    );
    if aging.is_empty() {
        println!("No aging issues.");
    }
    for item in aging.iter().take(top) {
        println!(
            "  [{}] {} {} ({})",
            item.status.as_str(),
            item.issue.id,
            item.issue.title,
            item.age_display
        );
    }
    if aging.len() > top {
        println!("  ... and {} more", aging.len() - top);
    }
    Ok(())
}

async fn handle_thresholds(db: &flowdash::Database, action: ThresholdAction) -> anyhow::Result<()> {
    match action {
        ThresholdAction::Show { json } => {
            let config = load_thresholds(db).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_threshold_config(&config);
            }
        }
        ThresholdAction::Set { warning, critical } => {
            let (warning_threshold, warning_unit) = parse_threshold(&warning)?;
            let (critical_threshold, critical_unit) = parse_threshold(&critical)?;
            let config = AgingThresholdConfig {
                warning_threshold,
                warning_unit,
                critical_threshold,
                critical_unit,
                use_auto_calculation: false,
                ..load_thresholds(db).await?
            };
            save_thresholds(db, config.clone()).await?;
            println!("Thresholds updated.");
            print_threshold_config(&config);
        }
        ThresholdAction::Auto {
            enable,
            disable,
            warning_percentile,
            critical_percentile,
        } => {
            let mut config = load_thresholds(db).await?;
            if enable {
                config.use_auto_calculation = true;
            }
            if disable {
                config.use_auto_calculation = false;
            }
            if let Some(p) = warning_percentile {
                config.auto_calc_percentile_warning = p;
            }
            if let Some(p) = critical_percentile {
                config.auto_calc_percentile_critical = p;
            }
            save_thresholds(db, config.clone()).await?;
            println!("Thresholds updated.");
            print_threshold_config(&config);
        }
        ThresholdAction::Calibrate { issues, now, json } => {
            let config = load_thresholds(db).await?;
            let now = parse_now(now.as_deref())?.with_timezone(&Utc);
            let issues = flowdash::issue::load_jsonl(&issues)?;
            let thresholds = resolve_thresholds(&config, &issues, now);
            if json {
                println!("{}", serde_json::to_string_pretty(&thresholds)?);
            } else {
                let source = if config.use_auto_calculation {
                    "percentiles of closed-issue cycle times"
                } else {
                    "manual settings"
                };
                println!("Effective thresholds ({source}):");
                println!("  Warning:  {:.1}h", thresholds.warning_hours);
                println!("  Critical: {:.1}h", thresholds.critical_hours);
            }
        }
        ThresholdAction::Reset => {
            save_thresholds(db, AgingThresholdConfig::default()).await?;
            println!("Thresholds reset to defaults.");
        }
    }
    Ok(())
}

fn print_threshold_config(config: &AgingThresholdConfig) {
    println!("Aging Thresholds");
    println!(
        "  Warning:  {} {}",
        config.warning_threshold,
        config.warning_unit.as_str()
    );
    println!(
        "  Critical: {} {}",
        config.critical_threshold,
        config.critical_unit.as_str()
    );
    if config.use_auto_calculation {
        println!(
            "  Auto:     on (P{:.0} warning, P{:.0} critical)",
            config.auto_calc_percentile_warning * 100.0,
            config.auto_calc_percentile_critical * 100.0
        );
    } else {
        println!("  Auto:     off");
    }
}

async fn handle_config(db: &flowdash::Database, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let val: Option<String> = db
                .call({
                    let key = key.clone();
                    move |conn| repository::get_config(conn, &key)
                })
                .await?;
            match val {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} is not set"),
            }
        }
        ConfigAction::Set { key, value } => {
            if key == repository::KEY_GRANULARITY {
                TimeGranularity::parse(&value)?;
            }
            if key == repository::KEY_AGING_THRESHOLDS {
                anyhow::bail!("Use 'flowdash thresholds' to change aging thresholds");
            }
            db.call(move |conn| repository::set_config(conn, &key, &value)).await?;
            println!("Config updated.");
        }
        ConfigAction::Unset { key } => {
            let removed = db
                .call({
                    let key = key.clone();
                    move |conn| repository::delete_config(conn, &key)
                })
                .await?;
            if removed {
                println!("{key} removed.");
            } else {
                println!("{key} is not set");
            }
        }
        ConfigAction::List => {
            let items: Vec<(String, String)> = db.call(|conn| repository::list_config(conn)).await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}
