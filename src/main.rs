use std::sync::Arc;

use anyhow::Context;
use env_logger::Env;
use impressum_scout::{
    configuration::get_configuration,
    dal::InMemoryDomainCache,
    services::{scrape_batch, scrape_serial, CachedScraper, Scraper},
};

const USAGE: &str = "usage: impressum-scout [--serial] <url>...";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let serial = args.first().is_some_and(|arg| arg == "--serial");
    if serial {
        args.remove(0);
    }
    if args.is_empty() {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    let cache = Arc::new(InMemoryDomainCache::new());
    let scraper = Arc::new(
        Scraper::from_settings(&configuration).context("Failed to build the scraper.")?,
    );
    let scraper = Arc::new(CachedScraper::new(
        scraper,
        cache.clone(),
        configuration.cache.validity(),
    ));

    let results = match serial {
        true => scrape_serial(scraper.as_ref(), &args, configuration.scraper.delay()).await,
        false => scrape_batch(scraper, &args, configuration.scraper.max_concurrency).await,
    };

    log::info!("Cached results for {} domains", cache.len().await);

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
