//! PARLAY ENGINE: rule-based parlay construction
//!
//! Entry point. Loads configuration, initialises structured logging, wires
//! the service to the seeded providers and prints one parlay plus the day's
//! top picks.
//!
//! Usage: `parlay-engine [legs] [wager] [ladder] [--json] [--explain]`

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{info, warn};

use parlay_engine::config::{self, AppConfig};
use parlay_engine::data::mock::{SeededOddsProvider, SeededSlateProvider};
use parlay_engine::engine::ParlayService;
use parlay_engine::types::{ParlayRequest, Requester};

const BANNER: &str = r#"
 ____   _    ____  _        _ __   __
|  _ \ / \  |  _ \| |      / \\ \ / /
| |_) / _ \ | |_) | |     / _ \\ V /
|  __/ ___ \|  _ <| |___ / ___ \| |
|_| /_/   \_\_| \_\_____/_/   \_\_|

  Hit-rate ladders, confidence tiers, diversified legs
  v0.1.0
"#;

const DEFAULT_LEGS: usize = 3;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        bot_name = %cfg.bot.name,
        default_ladder = cfg.bot.default_ladder,
        legs = format!("{}-{}", cfg.bot.min_legs, cfg.bot.max_legs),
        seeded = cfg.bot.selection_seed.is_some(),
        "PARLAY ENGINE starting up"
    );

    if let Some(env) = cfg.odds.api_key_env.as_deref() {
        if AppConfig::resolve_env(env).is_ok() {
            warn!(env, "Live odds feed is not wired in this build, using seeded odds");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let json_output = args.iter().any(|a| a == "--json");
    let explain = args.iter().any(|a| a == "--explain");
    let positional: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| !a.starts_with("--"))
        .collect();
    let request = parse_request(&cfg, &positional)?;

    let slate = SeededSlateProvider::new(cfg.bot.mock_seed);
    let odds = SeededOddsProvider::new(cfg.bot.mock_seed, slate.games().to_vec());
    let service = ParlayService::from_config(&cfg, Arc::new(slate), Arc::new(odds))?;

    let parlay = service.generate(request).await?;
    if json_output {
        println!("{}", serde_json::to_string_pretty(&*parlay)?);
        return Ok(());
    }

    println!("{parlay}");
    if let Some(requested) = parlay.ladder_snapped_from {
        println!("  (ladder {requested} is not supported, used {})", parlay.ladder);
    }
    for (i, leg) in parlay.legs.iter().enumerate() {
        println!("  {}. {leg}", i + 1);
        if let Some(caution) = leg.caution.as_ref().filter(|c| c.has_cautions()) {
            println!("     {caution}");
        }
    }

    let insights = parlay.insights();
    println!(
        "  avg hit rate {:.1}% | correlated legs {} | props {} | totals {}",
        insights.average_hit_rate, insights.correlated_legs, insights.player_props, insights.totals
    );
    if let Some(risk) = &insights.highest_risk {
        println!("  highest risk: {} ({:.1}%)", risk.label, risk.hit_rate_pct);
    }

    if explain {
        for explanation in service.explain_parlay(&parlay.id)? {
            println!("\n{explanation}");
        }
    }

    let picks = service.picks_of_the_day(5).await?;
    println!("\nPicks of the day:");
    if picks.is_empty() {
        println!("  none above the confidence floor today");
    }
    for pick in &picks {
        println!("  {} | {}", pick.confidence, pick.leg);
    }

    info!(parlay_id = %parlay.id, picks = picks.len(), "PARLAY ENGINE done");
    Ok(())
}

/// Positional `legs wager ladder`, each optional.
fn parse_request(cfg: &AppConfig, args: &[&str]) -> Result<ParlayRequest> {
    let legs = match args.first() {
        Some(raw) => raw.parse::<usize>().with_context(|| format!("Invalid leg count: {raw}"))?,
        None => DEFAULT_LEGS,
    };
    let wager = match args.get(1) {
        Some(raw) => raw
            .parse::<Decimal>()
            .with_context(|| format!("Invalid wager: {raw}"))?,
        None => Decimal::TEN,
    };
    let ladder = match args.get(2) {
        Some(raw) => raw.parse::<u32>().with_context(|| format!("Invalid ladder: {raw}"))?,
        None => cfg.bot.default_ladder,
    };

    Ok(ParlayRequest {
        legs,
        wager,
        ladder,
        min_confidence: None,
        requester: Requester::default(),
    })
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parlay_engine=info"));

    let json_logging = std::env::var("PARLAY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
