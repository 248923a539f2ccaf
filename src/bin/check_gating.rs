use std::sync::Arc;

use anyhow::{Context, Result};

use pairdeck_lib::gating::{countdown_state, GatingFetcher};
use pairdeck_lib::{AppConfig, SupabaseStore};

#[tokio::main]
async fn main() -> Result<()> {
    pairdeck_lib::init_logging();

    println!("🔧 Checking gating status...");
    let config = AppConfig::from_env().context("Failed to load PAIRDECK_* configuration")?;
    let fetcher = GatingFetcher::new(Arc::new(SupabaseStore::new(&config)?));

    println!("\n📊 Answer gap:");
    match fetcher.fetch_answer_gap_status().await {
        Ok(Some(gap)) if gap.threshold == 0 => println!("  disabled ({} unanswered by partner)", gap.unanswered_by_partner),
        Ok(Some(gap)) => println!(
            "  {}/{} unanswered by partner {}",
            gap.unanswered_by_partner,
            gap.threshold,
            if gap.is_blocked { "❌ blocked" } else { "✅ open" }
        ),
        Ok(None) => println!("  no status returned"),
        Err(e) => println!("  ❌ request failed: {}", e),
    }

    println!("\n📊 Daily limit:");
    match fetcher.fetch_daily_limit_status().await {
        Ok(Some(daily)) if daily.limit_value == 0 => println!("  unlimited ({} today)", daily.responses_today),
        Ok(Some(daily)) => {
            println!(
                "  {}/{} today, {} remaining {}",
                daily.responses_today,
                daily.limit_value,
                daily.remaining,
                if daily.is_blocked { "❌ blocked" } else { "✅ open" }
            );
            if let Some(reset_at) = daily.reset_at {
                println!("  resets in {}", countdown_state(reset_at, chrono::Utc::now()).text);
            }
        }
        Ok(None) => println!("  no status returned"),
        Err(e) => println!("  ❌ request failed: {}", e),
    }

    Ok(())
}
