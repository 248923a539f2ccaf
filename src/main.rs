use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;

use pairdeck_lib::questions::FeedMode;
use pairdeck_lib::skips::{FileKeyValueStore, SkipLedger};
use pairdeck_lib::{AppConfig, Identity, LogAnalytics, SessionParams, SupabaseStore, SwipeDeps, SwipeSession};

fn parse_args() -> Result<SessionParams> {
    let mut params = SessionParams::default();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pending" => params.mode = FeedMode::Pending,
            "--pack" => params.pack_id = Some(args.next().context("--pack needs a pack id")?),
            "--start" => params.start_question_id = Some(args.next().context("--start needs a question id")?),
            other => bail!("Unknown argument: {} (usage: pairdeck [--pending] [--pack ID] [--start QUESTION_ID])", other),
        }
    }

    Ok(params)
}

#[tokio::main]
async fn main() -> Result<()> {
    pairdeck_lib::init_logging();

    let params = parse_args()?;
    let config = AppConfig::from_env().context("Failed to load PAIRDECK_* configuration")?;

    let store = Arc::new(SupabaseStore::new(&config)?);
    let ledger = Arc::new(SkipLedger::new(Arc::new(FileKeyValueStore::new(&config.storage_dir))));
    let identity = Identity {
        user_id: config.user_id.clone(),
        couple_id: config.couple_id.clone(),
        partner_id: config.partner_id.clone(),
    };

    let (session, worker) = SwipeSession::new(
        SwipeDeps {
            store,
            identity: Arc::new(identity),
            ledger,
            analytics: Arc::new(LogAnalytics),
        },
        params,
    );
    let worker = tokio::spawn(worker.run());

    session.mount().await;
    let snapshot = session.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    drop(session);
    worker.await?;
    info!("👋 Done");
    Ok(())
}
