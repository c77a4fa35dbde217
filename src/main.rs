//! Wiring & DI. Entry point: load config, open the configured store, inject into
//! services, log the owner's dashboard. No business logic here.

use dotenv::dotenv;
use pregnancy_journal::adapters::backend::PostgrestStore;
use pregnancy_journal::adapters::clock::SystemClock;
use pregnancy_journal::adapters::persistence::SqliteRepo;
use pregnancy_journal::domain::Checkup;
use pregnancy_journal::ports::{Clock, PregnancyStore, RecordStore, ReminderStore};
use pregnancy_journal::shared::config::{AppConfig, StoreKind};
use pregnancy_journal::usecases::{DashboardService, ReminderService, TrendService};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// The ports the dashboard needs, served by one adapter instance.
struct Stores {
    pregnancies: Arc<dyn PregnancyStore>,
    reminders: Arc<dyn ReminderStore>,
    checkups: Arc<dyn RecordStore<Checkup>>,
}

impl Stores {
    fn from_adapter<A>(adapter: Arc<A>) -> Self
    where
        A: PregnancyStore + ReminderStore + RecordStore<Checkup> + 'static,
    {
        Self {
            pregnancies: adapter.clone(),
            reminders: adapter.clone(),
            checkups: adapter,
        }
    }
}

async fn open_stores(cfg: &AppConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Stores> {
    match cfg.store_kind()? {
        StoreKind::Sqlite => {
            let data_path = PathBuf::from(cfg.data_dir_or_default());
            let repo = SqliteRepo::connect(&data_path, clock)
                .await
                .map_err(|e| anyhow::anyhow!("SQLite connect failed: {}", e))?;
            info!(path = %repo.path().display(), "using local SQLite store");
            Ok(Stores::from_adapter(Arc::new(repo)))
        }
        StoreKind::Postgrest => {
            if !cfg.is_backend_configured() {
                anyhow::bail!(
                    "Set PREGNANCY_BACKEND_URL and PREGNANCY_BACKEND_ANON_KEY (or SUPABASE_URL / SUPABASE_ANON_KEY)"
                );
            }
            let url = cfg.backend_url.clone().unwrap_or_default();
            if cfg.backend_access_token.is_none() {
                warn!("PREGNANCY_BACKEND_ACCESS_TOKEN not set, requests run as the anon role");
            }
            info!(url = %url, "using hosted PostgREST store");
            Ok(Stores::from_adapter(Arc::new(PostgrestStore::new(
                url,
                cfg.backend_anon_key.clone().unwrap_or_default(),
                cfg.backend_access_token.clone(),
                clock,
            ))))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => info!(cwd = %cwd.display(), "no .env found (check CWD)"),
    }

    let cfg = AppConfig::load().map_err(|e| anyhow::anyhow!("config: {}", e))?;
    let Some(owner_id) = cfg.owner_id.clone().filter(|s| !s.is_empty()) else {
        anyhow::bail!("Set PREGNANCY_OWNER_ID (env or .env) to the user whose dashboard to show");
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let stores = open_stores(&cfg, Arc::clone(&clock)).await?;
    let upcoming_limit = cfg.upcoming_limit_or_default();

    // --- Services ---
    let dashboard = DashboardService::new(
        Arc::clone(&stores.pregnancies),
        Arc::clone(&stores.reminders),
        Arc::clone(&clock),
        upcoming_limit,
    );
    let reminders = ReminderService::new(
        Arc::clone(&stores.reminders),
        Arc::clone(&clock),
        upcoming_limit,
    );
    let trends = TrendService::new(Arc::clone(&stores.checkups));

    let Some(overview) = dashboard.overview(&owner_id).await? else {
        info!(owner_id = %owner_id, "no active pregnancy");
        return Ok(());
    };

    let p = &overview.pregnancy;
    info!(
        pregnancy_id = %p.id,
        age = %overview.age,
        trimester = overview.trimester,
        due_date = %overview.due_date,
        days_until_due = overview.days_until_due,
        "active pregnancy"
    );
    for r in &overview.upcoming {
        info!(date = %r.reminder_date, kind = %r.reminder_type, title = %r.title, "upcoming");
    }

    let overdue = reminders.overdue(&p.id).await?;
    if !overdue.is_empty() {
        warn!(count = overdue.len(), "open reminders are past their date");
    }

    if let Some(summary) = trends.weight_summary(&p.id).await? {
        info!(
            first_kg = summary.first_kg,
            last_kg = summary.last_kg,
            change_kg = summary.change_kg,
            "weight trend"
        );
    }
    if let Some(dir) = cfg.export_dir.as_deref() {
        let files = trends.export_csv(&p.id, dir).await?;
        info!(
            weight = %files.weight.display(),
            blood_pressure = %files.blood_pressure.display(),
            "trend CSV written"
        );
    }

    Ok(())
}
