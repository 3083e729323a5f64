use std::sync::{Arc, Mutex};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use apify_client::{ApifyClient, PollPolicy};
use talentraid_common::{Config, Platform, RaidStatus, ScrapingFilter};
use talentraid_scout::dedup::DedupIndex;
use talentraid_scout::enrichment::OpenAiEnricher;
use talentraid_scout::raid::RaidService;
use talentraid_scout::search::SearchService;
use talentraid_scout::traits::ApifyRunner;

/// Run one sourcing raid end to end and print it as JSON.
#[derive(Parser, Debug)]
#[command(name = "talentraid-scout", version)]
struct Args {
    /// What to search for, e.g. "Flutter".
    #[arg(long)]
    keyword: String,

    /// Comma-separated platforms, scraped in this order.
    #[arg(long, value_delimiter = ',', default_value = "upwork,fiverr")]
    platforms: Vec<Platform>,

    /// Raid name; defaults to the keyword.
    #[arg(long)]
    name: Option<String>,

    /// Unique candidates wanted per platform.
    #[arg(long)]
    max_results: Option<usize>,

    /// Skills that feed the skills-match score.
    #[arg(long, value_delimiter = ',')]
    skills: Vec<String>,

    /// Profile URLs the campaign already has.
    #[arg(long, value_delimiter = ',')]
    exclude_urls: Vec<String>,

    /// Stop after Phase 1.
    #[arg(long)]
    skip_enrichment: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("talentraid=info".parse()?))
        .init();

    let args = Args::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let policy = PollPolicy::from_timeout(config.apify_run_timeout, config.apify_poll_interval);
    let runner = ApifyRunner::new(ApifyClient::new(config.apify_api_token.clone()), policy);
    let search = SearchService::new(Arc::new(runner), Arc::new(Mutex::new(DedupIndex::new())));
    let enricher = OpenAiEnricher::new(
        OpenAi::new(config.openai_api_key.clone(), config.openai_model.clone()),
        config.enrichment_concurrency,
    );
    let raids = RaidService::new(search, Arc::new(enricher)).with_max_attempts(config.scrape_max_attempts);

    let connections = raids.validate_connections().await;
    if !connections.all_ok() {
        warn!(?connections, "Some external services are unreachable, continuing anyway");
    }

    let mut filter = ScrapingFilter::builder()
        .keyword(args.keyword.clone())
        .platforms(args.platforms)
        .skills(args.skills)
        .existing_profile_urls(args.exclude_urls)
        .build();
    filter.max_results = args.max_results;

    let name = args.name.unwrap_or_else(|| args.keyword.clone());
    let raid = raids.start_raid(&name, &filter);
    let mut raid = raids.execute_scraping(raid.id, &filter).await?;

    if raid.status == RaidStatus::Enrichment && !args.skip_enrichment {
        raid = raids.execute_enrichment(raid.id).await?;
    }

    if raid.status.is_terminal() {
        info!(
            raid_id = %raid.id,
            scraped = raid.stats.total_scraped,
            enriched = raid.stats.total_enriched,
            "Raid ready to export"
        );
    } else {
        warn!(
            raid_id = %raid.id,
            status = %raid.status,
            scraped = raid.stats.total_scraped,
            "Raid stopped before export"
        );
    }
    println!("{}", serde_json::to_string_pretty(&raid)?);
    Ok(())
}
