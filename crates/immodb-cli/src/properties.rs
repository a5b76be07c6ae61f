//! Ingested property queries.

use clap::Subcommand;
use sqlx::SqlitePool;

/// Sub-commands available under `properties`.
#[derive(Debug, Subcommand)]
pub enum PropertiesCommands {
    /// List ingested properties, newest first
    List {
        /// Filter by source portal
        #[arg(long)]
        source: Option<String>,
        /// Filter by city substring, case-insensitive
        #[arg(long)]
        city: Option<String>,
        /// Maximum number of rows to show
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Number of rows to skip
        #[arg(long, default_value = "0")]
        offset: i64,
    },
}

/// Prints a page of ingested properties plus the total match count.
///
/// # Errors
///
/// Returns an error when a property query fails.
pub(crate) async fn run_properties_list(
    pool: &SqlitePool,
    source: Option<&str>,
    city: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<()> {
    let total = immodb_db::count_properties(pool, source, city).await?;
    let rows = immodb_db::list_properties(pool, source, city, limit, offset).await?;

    if rows.is_empty() {
        println!("no properties found; run `immodb scrape run` first");
        return Ok(());
    }

    println!(
        "{:<40}{:<16}{:<10}{:<12}TITLE",
        "CODE", "CITY", "CONTRACT", "PRICE"
    );
    for row in &rows {
        let price = row
            .price_sale
            .or(row.price_rent_monthly)
            .map_or_else(|| "\u{2014}".to_string(), |price| format!("{price:.0}"));
        let title = if row.title.chars().count() > 50 {
            format!("{}...", row.title.chars().take(50).collect::<String>())
        } else {
            row.title.clone()
        };
        println!(
            "{:<40}{:<16}{:<10}{:<12}{}",
            row.code, row.city, row.contract_type, price, title
        );
    }
    println!();
    println!("showing {} of {total} matching properties", rows.len());
    Ok(())
}
