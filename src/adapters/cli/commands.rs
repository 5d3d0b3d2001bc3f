//! CLI Command Handlers
//!
//! Implementation of the `analyze` and `demo` commands.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::adapters::market_data::{
    CachedPriceHistory, SyntheticConfig, SyntheticOuHistory, YahooChartClient,
};
use crate::application::{AnalysisError, AnalysisReport, AnalysisSession, PairAnalyzer, PairForm};
use crate::config::{load_config, Config, DataProvider};
use crate::domain::TrajectoryPoint;
use crate::ports::market_data::{PriceHistoryPort, SamplingMode};
use crate::strategy::AnalysisSettings;

/// OU Pairs - mean-reversion estimation and optimal sizing for a price spread
#[derive(Parser, Debug)]
#[command(
    name = "ou-pairs",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "OU mean-reversion estimation and power-utility position sizing for a pairs spread",
    long_about = "ou-pairs fits an Ornstein-Uhlenbeck model to the spread between two price \
                  series and replays the closed-form optimal position for a power-utility \
                  investor along the realized spread."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a ticker pair, estimate the spread and simulate the optimal policy
    Analyze(AnalyzeCmd),

    /// Run the pipeline on a synthetic OU pair (no network)
    Demo(DemoCmd),
}

/// Analyze a real ticker pair
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// First leg (spread = ticker1 - ticker2)
    #[arg(long, value_name = "TICKER")]
    pub ticker1: Option<String>,

    /// Second leg
    #[arg(long, value_name = "TICKER")]
    pub ticker2: Option<String>,

    /// Use minute closes over the last few days instead of a year of daily closes
    #[arg(long)]
    pub intraday: bool,

    /// Risk aversion; repeat or comma-separate to compare several values on the same spread
    #[arg(long, value_name = "GAMMA", value_delimiter = ',', allow_hyphen_values = true)]
    pub gamma: Vec<f64>,

    /// Initial wealth
    #[arg(long, value_name = "W0")]
    pub wealth: Option<f64>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Export the report to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,

    /// Trajectory rows to print from each end
    #[arg(long, value_name = "N", default_value = "5")]
    pub rows: usize,
}

/// Analyze a synthetic pair with a known spread process
#[derive(Parser, Debug)]
pub struct DemoCmd {
    /// True mean-reversion speed per step
    #[arg(long, default_value = "0.2")]
    pub k: f64,

    /// True long-run mean
    #[arg(long, default_value = "1.5", allow_negative_numbers = true)]
    pub mu: f64,

    /// True volatility per step
    #[arg(long, default_value = "0.3")]
    pub sigma: f64,

    /// Observations per leg
    #[arg(long, default_value = "250")]
    pub steps: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Risk aversion
    #[arg(long, default_value = "-16", allow_negative_numbers = true)]
    pub gamma: f64,

    /// Initial wealth
    #[arg(long, default_value = "100")]
    pub wealth: f64,

    /// Trajectory rows to print from each end
    #[arg(long, value_name = "N", default_value = "5")]
    pub rows: usize,
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    let config = match &app.command {
        Command::Analyze(AnalyzeCmd { config: Some(path), .. }) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        _ => Config::default(),
    };

    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Analyze(cmd) => analyze_command(cmd, config).await,
        Command::Demo(cmd) => demo_command(cmd).await,
    }
}

/// Initialize logging system
///
/// RUST_LOG wins; otherwise --debug, then --verbose, then the configured level.
fn init_logging(verbose: bool, debug: bool, configured: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        configured
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Attach the operator hint to an analysis failure
fn with_hint(err: AnalysisError) -> anyhow::Error {
    let hint = err.user_hint();
    anyhow::Error::new(err).context(hint)
}

/// Handle analyze command
async fn analyze_command(cmd: AnalyzeCmd, config: Config) -> Result<()> {
    let mut settings = AnalysisSettings::from(&config);
    if let Some(&gamma) = cmd.gamma.first() {
        settings.gamma = gamma;
    }
    if let Some(wealth) = cmd.wealth {
        settings.initial_wealth = wealth;
    }
    settings.validate().context("Invalid analysis settings")?;

    let form = PairForm {
        ticker1: cmd.ticker1.clone().unwrap_or_else(|| config.pair.ticker1.clone()),
        ticker2: cmd.ticker2.clone().unwrap_or_else(|| config.pair.ticker2.clone()),
        intraday: cmd.intraday || config.pair.intraday,
    };

    let data = &config.data;
    match data.provider {
        DataProvider::Yahoo => {
            let client = YahooChartClient::with_config(data.yahoo_config())
                .context("Failed to create Yahoo chart client")?;
            let cached = CachedPriceHistory::with_config(
                client,
                data.cache_ttl(),
                CachedPriceHistory::<YahooChartClient>::DEFAULT_MAX_ENTRIES,
            );
            let analyzer = PairAnalyzer::new(cached).with_lookbacks(
                data.lookback(SamplingMode::Daily),
                data.lookback(SamplingMode::Intraday),
            );
            run_session(&analyzer, form, settings, &cmd).await
        }
        DataProvider::Synthetic => {
            let synthetic = SyntheticOuHistory::new(SyntheticConfig {
                ticker1: form.ticker1.clone(),
                ticker2: form.ticker2.clone(),
                ..SyntheticConfig::default()
            });
            let analyzer = PairAnalyzer::new(synthetic);
            run_session(&analyzer, form, settings, &cmd).await
        }
    }
}

async fn run_session<P: PriceHistoryPort>(
    analyzer: &PairAnalyzer<P>,
    form: PairForm,
    settings: AnalysisSettings,
    cmd: &AnalyzeCmd,
) -> Result<()> {
    let mut session = AnalysisSession::new(form, settings);

    let report = session.submit(analyzer).await.map_err(with_hint)?.clone();
    print_report(&report, cmd.rows);

    if let Some(ref path) = cmd.export_json {
        export_json(&report, path)?;
    }

    // Additional gammas reuse the fetched spread
    if cmd.gamma.len() > 1 {
        println!();
        println!("Risk aversion comparison");
        println!("{:>10}  {:>16}  {:>12}  {:>12}  {:>6}", "gamma", "final wealth", "return", "max dd", "floors");
        print_comparison_row(&report);
        for &gamma in &cmd.gamma[1..] {
            let rerun = session
                .rerun_with(settings.with_gamma(gamma))
                .map_err(with_hint)?;
            print_comparison_row(rerun);
        }
    }

    Ok(())
}

/// Handle demo command
async fn demo_command(cmd: DemoCmd) -> Result<()> {
    let synthetic = SyntheticConfig {
        k: cmd.k,
        mu: cmd.mu,
        sigma: cmd.sigma,
        steps: cmd.steps,
        seed: cmd.seed,
        ..SyntheticConfig::default()
    };
    tracing::info!(
        "Demo pair: k = {}, mu = {}, sigma = {}, {} steps, seed {}",
        cmd.k, cmd.mu, cmd.sigma, cmd.steps, cmd.seed
    );

    let form = PairForm {
        ticker1: synthetic.ticker1.clone(),
        ticker2: synthetic.ticker2.clone(),
        intraday: false,
    };
    let settings = AnalysisSettings::default()
        .with_gamma(cmd.gamma)
        .with_initial_wealth(cmd.wealth);
    settings.validate().context("Invalid analysis settings")?;

    let analyzer = PairAnalyzer::new(SyntheticOuHistory::new(synthetic));
    let mut session = AnalysisSession::new(form, settings);
    let report = session.submit(&analyzer).await.map_err(with_hint)?;

    println!("True parameters:  k = {:.6}, mu = {:.6}, sigma = {:.6}", cmd.k, cmd.mu, cmd.sigma);
    print_report(report, cmd.rows);
    Ok(())
}

fn export_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = report.to_json().context("Failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Report written to {}", path.display());
    Ok(())
}

fn print_report(report: &AnalysisReport, rows: usize) {
    let pair = &report.pair;
    println!("======================================");
    println!("  Spread {} - {} ({}, {})", pair.ticker1, pair.ticker2, pair.mode, pair.provider);
    if let (Some(first), Some(last)) = (pair.first_timestamp, pair.last_timestamp) {
        println!("  {} observations, {} to {}", pair.observations, first, last);
    }
    println!("======================================");
    print!("{}", report.render_parameters());
    if let Some(z) = report.current_z_score {
        println!("Current z-score:                    {:.3}", z);
    }
    if !report.params.is_mean_reverting() {
        println!("WARNING: k <= 0, the spread is not mean-reverting over this window");
    }

    let summary = &report.summary;
    println!();
    println!("Simulation (gamma = {}, W0 = {})", report.settings.gamma, summary.initial_wealth);
    println!("  Final wealth:   {:.4}", summary.final_wealth);
    println!("  Total return:   {:.2}%", summary.total_return * 100.0);
    println!("  Max drawdown:   {:.2}%", summary.max_drawdown * 100.0);
    println!("  Floor clamps:   {}", summary.floor_hits);
    println!("  Final utility:  {:.6}", summary.terminal_utility);

    if rows == 0 {
        return;
    }
    println!();
    println!("{:<26}  {:>14}  {:>16}  {:>16}", "timestamp", "spread", "position", "wealth");
    let head = report.head(rows);
    let tail = report.tail(rows);
    for point in &head {
        print_row(point);
    }
    if report.trajectory.len() > 2 * rows {
        println!("{:<26}", "...");
    }
    let overlap = (head.len() + tail.len()).saturating_sub(report.trajectory.len());
    for point in tail.iter().skip(overlap) {
        print_row(point);
    }
}

fn print_row(point: &TrajectoryPoint) {
    println!(
        "{:<26}  {:>14.6}  {:>16.4}  {:>16.4}",
        point.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        point.spread,
        point.position,
        point.wealth
    );
}

fn print_comparison_row(report: &AnalysisReport) {
    let s = &report.summary;
    println!(
        "{:>10}  {:>16.4}  {:>11.2}%  {:>11.2}%  {:>6}",
        report.settings.gamma,
        s.final_wealth,
        s.total_return * 100.0,
        s.max_drawdown * 100.0,
        s.floor_hits
    );
}
