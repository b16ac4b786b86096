// ABOUTME: CLI commands that change or check the database contents
// ABOUTME: CSV load, department migration and integrity verification

use anyhow::Context;
use catalog_core::Config;
use catalog_storage::{
    Database, LoadSummary, Loader, LoaderOptions, MigrationOptions, Migrator, Verification,
};
use colored::*;

use super::utils::{mark, new_table, or_dash};

async fn open(config: &Config) -> anyhow::Result<Database> {
    Database::open(config)
        .await
        .with_context(|| format!("Failed to open {}", config.database_path.display()))
}

pub async fn load(config: &Config) -> anyhow::Result<()> {
    let db = open(config).await?;
    let loader = Loader::new(
        db.pool().clone(),
        LoaderOptions {
            batch_size: config.batch_size,
        },
    );

    println!(
        "{} {}",
        "Loading".blue().bold(),
        config.csv_path.display().to_string().cyan()
    );

    let report = loader.load_csv(&config.csv_path).await?;
    let summary = loader.verify().await?;
    db.close().await;

    let mut table = new_table(&["Rows", "Count"]);
    table.add_row(vec!["Read".to_string(), report.rows_read.to_string()]);
    table.add_row(vec!["Loaded".to_string(), report.rows_loaded.to_string()]);
    table.add_row(vec!["Dropped".to_string(), report.rows_dropped.to_string()]);
    table.add_row(vec!["Chunks".to_string(), report.chunks.to_string()]);
    println!("{}", table);

    print_summary(&summary);
    println!("{}", "✅ Load complete".green().bold());
    Ok(())
}

pub async fn migrate(config: &Config, drop_backup: bool) -> anyhow::Result<()> {
    let db = open(config).await?;
    let migrator = Migrator::new(db.pool().clone(), MigrationOptions { drop_backup });

    let report = migrator.run().await?;
    db.close().await;

    let mut table = new_table(&["Step", "Applied", "Detail"]);
    for outcome in &report.steps {
        table.add_row(vec![
            outcome.step.to_string(),
            if outcome.applied {
                "yes".green().to_string()
            } else {
                "skipped".dimmed().to_string()
            },
            outcome.detail.clone(),
        ]);
    }
    println!("{}", table);

    print_verification(&report.verification);

    if report.backup_dropped {
        println!("{}", "Backup table dropped".yellow());
    }
    if report.changed_anything() {
        println!("{}", "✅ Migration complete".green().bold());
    } else {
        println!("{}", "Schema already migrated; nothing to do".dimmed());
    }
    Ok(())
}

pub async fn verify(config: &Config) -> anyhow::Result<()> {
    let db = open(config).await?;
    let summary = Loader::new(db.pool().clone(), LoaderOptions::default())
        .verify()
        .await?;
    print_summary(&summary);

    let migrator = Migrator::new(db.pool().clone(), MigrationOptions::default());
    let state = migrator.inspect().await?;
    if !state.has_department_id {
        db.close().await;
        println!(
            "{}",
            "Schema not migrated yet; run `catalog migrate`".yellow()
        );
        return Ok(());
    }

    let verification = migrator.verify().await?;
    db.close().await;

    print_verification(&verification);
    for difference in verification.backup_drift() {
        println!("{} {}", "Backup drift:".yellow().bold(), difference);
    }
    let failures = verification.failures();
    if failures.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("verification failed: {}", failures.join("; "))
    }
}

fn print_summary(summary: &LoadSummary) {
    let mut table = new_table(&["Data quality", "Value"]);
    table.add_row(vec![
        "Total products".to_string(),
        summary.total_products.to_string(),
    ]);
    table.add_row(vec![
        "Total departments".to_string(),
        or_dash(summary.total_departments),
    ]);
    table.add_row(vec![
        "Products with invalid prices".to_string(),
        summary.invalid_prices.to_string(),
    ]);
    table.add_row(vec![
        "Products linked to a department".to_string(),
        or_dash(summary.linked_products),
    ]);
    println!("{}", table);
}

fn print_verification(verification: &Verification) {
    let mut table = new_table(&["Check", "Value", ""]);
    table.add_row(vec![
        "Departments".to_string(),
        verification.department_count.to_string(),
        mark(verification.department_count > 0),
    ]);
    table.add_row(vec![
        "Products / backup".to_string(),
        format!(
            "{} / {}",
            verification.product_count,
            or_dash(verification.backup_count)
        ),
        mark(
            verification
                .backup_count
                .map_or(true, |b| b == verification.product_count),
        ),
    ]);
    table.add_row(vec![
        "Null department_id".to_string(),
        verification.null_department_ids.to_string(),
        mark(verification.null_department_ids == 0),
    ]);
    table.add_row(vec![
        "Orphaned products".to_string(),
        verification.orphaned_products.to_string(),
        mark(verification.orphaned_products == 0),
    ]);
    table.add_row(vec![
        "Legacy column removed".to_string(),
        (!verification.legacy_column_present).to_string(),
        mark(!verification.legacy_column_present),
    ]);
    table.add_row(vec![
        "Foreign key".to_string(),
        verification.foreign_key_present.to_string(),
        mark(verification.foreign_key_present),
    ]);
    table.add_row(vec![
        "Department names preserved".to_string(),
        or_dash(verification.mismatched_departments.map(|n| format!("{} mismatched", n))),
        mark(verification.mismatched_departments.unwrap_or(0) == 0),
    ]);
    println!("{}", table);
}
