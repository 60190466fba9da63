use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::{AppContext, FinwireError, Result};
use crate::daemon::{Daemon, DaemonConfig};
use crate::domain::NewsItem;

pub fn list_sources(ctx: &AppContext) -> Result<()> {
    let collectors = ctx.aggregator.collectors();

    if collectors.is_empty() {
        println!("No sources enabled");
        return Ok(());
    }

    for (i, collector) in collectors.iter().enumerate() {
        println!("{:>3}. {}", i + 1, collector.name());
    }
    Ok(())
}

pub async fn collect(ctx: &AppContext, limit: Option<usize>, json: bool) -> Result<()> {
    let aggregation = ctx.aggregator.collect_all().await;
    ctx.aggregator.close().await;
    let aggregation = aggregation?;

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregation)?);
        return Ok(());
    }

    let items = &aggregation.collection.items;
    if items.is_empty() {
        println!("No news collected");
        return Ok(());
    }

    for item in items.iter().take(limit.unwrap_or(items.len())) {
        println!("{}", format_item(item));
    }

    println!();
    for (source, count) in &aggregation.source_stats {
        println!("  {:<16} {}", source, count);
    }
    println!("Collected {} items", items.len());
    Ok(())
}

pub async fn refresh(ctx: &AppContext, output: Option<&Path>) -> Result<()> {
    let entry = ctx.cache.refresh().await;
    ctx.aggregator.close().await;
    let entry = entry?;

    match output {
        Some(path) => {
            entry.write_to(path)?;
            println!("Wrote {} items to {}", entry.news_count, path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(entry.as_ref())?),
    }
    Ok(())
}

pub async fn serve(
    ctx: Arc<AppContext>,
    interval: Option<&str>,
    max_age: Option<&str>,
    no_initial_update: bool,
    warm_from: Option<PathBuf>,
) -> Result<()> {
    let refresh_interval_secs = match interval {
        Some(s) => DaemonConfig::parse_interval(s).map_err(FinwireError::Config)?,
        None => ctx.config.cache.refresh_interval().as_secs(),
    };
    let max_age_secs = match max_age {
        Some(s) => DaemonConfig::parse_interval(s).map_err(FinwireError::Config)?,
        None => ctx.config.cache.max_age().as_secs(),
    };

    let config = DaemonConfig {
        refresh_interval_secs,
        max_age_secs,
        update_on_start: !no_initial_update,
        warm_from,
    };

    Daemon::new(ctx, config).run().await
}

fn format_item(item: &NewsItem) -> String {
    let time = item
        .published_at
        .map(|t| t.format("%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "--".to_string());
    format!(
        "[{}] {:<11} {} ({})",
        time,
        item.category.as_str(),
        item.title,
        item.source
    )
}
