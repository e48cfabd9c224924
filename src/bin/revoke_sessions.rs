//! Drop every session and refresh record of one subject.
//!
//! $ cargo run --bin revoke-sessions -- --subject <uuid> [--settings settings/dev.toml]

use clap::Parser;
use sessiond::application_impl::RevocationManager;
use sessiond::domain_model::SubjectId;
use sessiond::infra_redis::RedisSessionStore;
use sessiond::logger::*;
use sessiond::settings::parse_settings;
use std::sync::Arc;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    settings: Option<String>,
    /// Subject id as a UUID
    #[arg(long)]
    subject: SubjectId,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logger = Logger::new_bootstrap();

    let settings = parse_settings(args.settings.as_deref())?;
    if settings.store.backend != "redis" {
        return Err(anyhow::anyhow!(
            "store backend {:?} keeps sessions in the server process",
            settings.store.backend
        ));
    }

    let client = redis::Client::open(settings.store.redis_url.as_str())?;
    let manager = client.get_connection_manager().await?;
    let store = Arc::new(RedisSessionStore::new(
        manager,
        settings.store.key_prefix.clone(),
    ));

    RevocationManager::new(store).revoke_all(args.subject).await?;
    info!(subject_id = %args.subject, "done");
    Ok(())
}
