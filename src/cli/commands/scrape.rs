//! Standalone scrape command.

use console::style;

use crate::config::Settings;
use crate::scrapers::HybridScraper;

/// Run the hybrid scraper against one URL and print the extracted text.
pub async fn cmd_scrape(settings: &Settings, url: &str) -> anyhow::Result<()> {
    let scraper = HybridScraper::from_config(&settings.scraper)?;

    eprintln!("{} Fetching {}", style("→").cyan(), url);
    match scraper.scrape(url).await {
        Ok(text) => {
            eprintln!(
                "  {} {} characters",
                style("✓").green(),
                text.chars().count()
            );
            println!("{}", text);
            Ok(())
        }
        Err(e) => {
            eprintln!("  {} {}", style("✗").red(), e);
            Err(e.into())
        }
    }
}
