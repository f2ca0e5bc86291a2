use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use milestone_scanner::config::{Config, ScanProfile};
use milestone_scanner::error::Result;
use milestone_scanner::fetcher::transport::build_client;
use milestone_scanner::fetcher::{transport_order, ResilientFetcher};
use milestone_scanner::history::HistoryLoader;
use milestone_scanner::league::League;
use milestone_scanner::metrics::FetchLatency;
use milestone_scanner::politeness::PolitenessGate;
use milestone_scanner::roster::{self, EntitySource};
use milestone_scanner::scan::{LeagueScanner, ScanOrchestrator};
use milestone_scanner::sink;
use milestone_scanner::state::EntityCache;
use milestone_scanner::types::StatType;

#[derive(Parser, Debug)]
#[command(name = "scanner", about = "Find athletes closing in on a round-number career milestone")]
struct Cli {
    /// nhl | nba
    #[arg(long)]
    league: Option<League>,
    /// points | goals | assists | rebounds
    #[arg(long)]
    stat: Option<StatType>,
    /// Milestone spacing (e.g. 100 goals, 1000 points)
    #[arg(long)]
    step: Option<i64>,
    /// Report entities at most this far from the next milestone
    #[arg(long)]
    within: Option<i64>,
    /// Skip entities whose career total is below this
    #[arg(long)]
    min_career: Option<i64>,
    #[arg(long)]
    concurrency: Option<usize>,
    /// Read entities from a JSON file instead of league rosters
    #[arg(long)]
    entities: Option<PathBuf>,
    #[arg(long)]
    output: Option<String>,
    /// Load per-game history for matches and compute milestone lift
    #[arg(long)]
    deep_dive: bool,
}

impl Cli {
    fn apply(self, cfg: &mut Config) -> Option<PathBuf> {
        if self.league.is_some() || self.stat.is_some() {
            let league = self.league.unwrap_or(cfg.profile.league);
            let stat = self.stat.unwrap_or(cfg.profile.stat);
            cfg.profile = ScanProfile::preset(league, stat);
            cfg.team_resolver = league.team_resolver(cfg.team_resolver.fallback_to_previous);
        }
        if let Some(step) = self.step {
            cfg.profile.step = step;
        }
        if let Some(within) = self.within {
            cfg.profile.within = within;
        }
        if let Some(min) = self.min_career {
            cfg.profile.min_career = min;
        }
        if let Some(c) = self.concurrency {
            cfg.concurrency = c;
        }
        if let Some(out) = self.output {
            cfg.output_path = out;
        }
        cfg.deep_dive |= self.deep_dive;
        self.entities
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };
    let entities_file = cli.apply(&mut cfg);
    if let Err(e) = cfg.validate() {
        eprintln!("Config error: {e}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg, entities_file).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config, entities_file: Option<PathBuf>) -> Result<()> {
    let profile = cfg.profile;
    info!(
        league = %profile.league,
        stat = %profile.stat,
        step = profile.step,
        within = profile.within,
        min_career = profile.min_career,
        concurrency = cfg.concurrency,
        "scan configured"
    );

    // --- Fetch stack ---
    let client = build_client(cfg.fetch.attempt_timeout)?;
    let transports = transport_order(client, &cfg.proxy_endpoint, cfg.proxy_api_key.as_deref());
    let gate = Arc::new(PolitenessGate::new(cfg.politeness));
    let latency = Arc::new(FetchLatency::new());
    let fetcher = Arc::new(ResilientFetcher::new(
        transports,
        gate,
        cfg.fetch,
        Arc::clone(&latency),
    ));
    info!(transports = ?fetcher.transport_names(), "fetcher ready");

    // --- Entities ---
    let source = match entities_file {
        Some(path) => EntitySource::File(path),
        None => EntitySource::League(profile.league),
    };
    let entities = roster::load(&source, &fetcher, &cfg.nba_season).await?;

    // --- Per-entity pipeline ---
    let mut scanner =
        LeagueScanner::new(Arc::clone(&fetcher), profile, cfg.team_resolver.clone());
    if cfg.deep_dive {
        let cache = Arc::new(EntityCache::on_disk(&cfg.cache_dir).await?);
        let history = Arc::new(HistoryLoader::new(
            Arc::clone(&fetcher),
            cache,
            profile.league,
        ));
        scanner = scanner.with_history(history, cfg.lift_approach);
        info!(cache_dir = %cfg.cache_dir, "deep dive enabled");
    }
    let scanner = Arc::new(scanner);

    let orchestrator = ScanOrchestrator::new();
    let report = orchestrator
        .run(entities, cfg.concurrency, move |entity| {
            let scanner = Arc::clone(&scanner);
            async move { scanner.scan(entity).await }
        })
        .await?;

    for skipped in &report.skipped {
        warn!(
            entity_id = %skipped.entity.id,
            name = %skipped.entity.display_name,
            "skipped: {}",
            skipped.reason
        );
    }

    sink::write_json(std::path::Path::new(&cfg.output_path), &report.verdicts).await?;

    match latency.percentiles() {
        Some((p50, p95, max)) => info!(
            requests = latency.len(),
            p50_ms = p50,
            p95_ms = p95,
            max_ms = max,
            "fetch latency"
        ),
        None => info!("no upstream responses recorded"),
    }
    info!(
        matched = report.verdicts.len(),
        scanned = report.scanned,
        omitted = report.omitted,
        skipped = report.skipped.len(),
        failures = ?report.failures,
        output = %cfg.output_path,
        "run complete"
    );

    Ok(())
}
