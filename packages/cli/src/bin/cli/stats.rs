use anyhow::Context;
use catalog_core::Config;
use catalog_storage::{Database, StatsStorage};
use colored::*;

use super::utils::{new_table, or_dash};

pub async fn show_stats(config: &Config) -> anyhow::Result<()> {
    let db = Database::open(config)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let stats = StatsStorage::new(db.pool().clone()).collect().await?;
    db.close().await;

    println!("{}", "📊 Catalog Statistics".blue().bold());
    println!();

    let mut totals = new_table(&["Metric", "Value"]);
    totals.add_row(vec!["Products".to_string(), stats.total_products.to_string()]);
    totals.add_row(vec!["Categories".to_string(), stats.total_categories.to_string()]);
    totals.add_row(vec!["Brands".to_string(), stats.total_brands.to_string()]);
    totals.add_row(vec!["Departments".to_string(), stats.total_departments.to_string()]);
    totals.add_row(vec![
        "Average price".to_string(),
        or_dash(stats.price_stats.average_price),
    ]);
    totals.add_row(vec!["Min price".to_string(), or_dash(stats.price_stats.min_price)]);
    totals.add_row(vec!["Max price".to_string(), or_dash(stats.price_stats.max_price)]);
    println!("{}", totals);

    let mut ranking = new_table(&["Top categories", "Top brands", "Top departments"]);
    let rows = stats
        .top_categories
        .len()
        .max(stats.top_brands.len())
        .max(stats.top_departments.len());
    for i in 0..rows {
        ranking.add_row(vec![
            or_dash(
                stats
                    .top_categories
                    .get(i)
                    .map(|c| format!("{} ({})", c.category, c.count)),
            ),
            or_dash(
                stats
                    .top_brands
                    .get(i)
                    .map(|b| format!("{} ({})", b.brand, b.count)),
            ),
            or_dash(
                stats
                    .top_departments
                    .get(i)
                    .map(|d| format!("{} ({})", d.department, d.count)),
            ),
        ]);
    }
    println!("{}", ranking);

    Ok(())
}
