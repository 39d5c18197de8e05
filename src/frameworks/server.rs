// Framework bootstrap for the game backend runtime.

use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::domain::abilities::AbilityCatalog;
use crate::domain::entities::{ItemEffect, ItemKind, LootItem};
use crate::domain::ports::Repository;
use crate::domain::tuning::{CombatTuning, LootTuning, RegenTuning, SpawnTuning};
use crate::frameworks::{config, db};
use crate::interface_adapters::memory::InMemoryRepository;
use crate::interface_adapters::net::event_serializer;
use crate::interface_adapters::routes::app;
use crate::interface_adapters::state::{AppState, SystemClock};
use crate::use_cases::cooldowns::CooldownTracker;
use crate::use_cases::simulation::WorldSimulator;

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state().await?;

    let app = app(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let repo: Arc<dyn Repository> = match config::database_url() {
        Some(url) => {
            let pool = db::connect_pool(&url).await.map_err(std::io::Error::other)?;
            db::run_migrations(&pool).await.map_err(std::io::Error::other)?;
            info!("postgres storage ready");
            Arc::new(db::PostgresRepository::new(pool))
        }
        None => {
            // Useful for local play and tests; world state dies with the
            // process.
            warn!("DATABASE_URL not set; using in-memory storage");
            Arc::new(InMemoryRepository::new())
        }
    };

    if let Err(e) = seed_loot_catalog(repo.as_ref()).await {
        warn!(error = %e, "failed to seed loot catalog");
    }

    // Channel wiring for the broadcast fan-out.
    let (events_tx, events_rx) = broadcast::channel(config::EVENT_CHANNEL_CAPACITY);
    let (frames_tx, _frames_rx) = broadcast::channel(config::FRAME_CHANNEL_CAPACITY);

    // Serialize events once and share the bytes with every connection.
    tokio::spawn(event_serializer(events_rx, frames_tx.clone()));

    // Spawn the autonomous world simulation.
    let simulator = Arc::new(WorldSimulator {
        repo: repo.clone(),
        clock: SystemClock,
        events_tx: events_tx.clone(),
        spawn_tuning: SpawnTuning::default(),
        regen_tuning: RegenTuning::default(),
        loot_tuning: LootTuning::default(),
    });
    simulator.spawn_tasks();

    Ok(Arc::new(AppState {
        repo,
        catalog: Arc::new(AbilityCatalog::builtin()),
        cooldowns: Arc::new(CooldownTracker::new()),
        events_tx,
        frames_tx,
        combat_tuning: CombatTuning::default(),
        loot_tuning: LootTuning::default(),
    }))
}

/// Make sure the canonical drop and starter items exist. The ids are
/// stable so reseeding is idempotent on both storage backends.
async fn seed_loot_catalog(repo: &dyn Repository) -> std::result::Result<(), String> {
    let existing = repo.get_all_loot_items().await?;
    let seeds = [
        LootItem {
            id: "bone".to_string(),
            name: "Bone".to_string(),
            kind: ItemKind::Material,
            rarity: "common".to_string(),
            effect: None,
            stackable: true,
        },
        LootItem {
            id: "meat".to_string(),
            name: "Meat".to_string(),
            kind: ItemKind::Consumable,
            rarity: "common".to_string(),
            effect: Some(ItemEffect {
                health: 50,
                aura: 0,
            }),
            stackable: true,
        },
        LootItem {
            id: "healing_herb".to_string(),
            name: "Healing Herb".to_string(),
            kind: ItemKind::Consumable,
            rarity: "uncommon".to_string(),
            effect: Some(ItemEffect {
                health: 250,
                aura: 100,
            }),
            stackable: true,
        },
    ];

    for seed in seeds {
        if existing.iter().any(|item| item.id == seed.id) {
            continue;
        }
        info!(item_id = %seed.id, "seeding loot item");
        repo.create_loot_item(seed).await?;
    }
    Ok(())
}
