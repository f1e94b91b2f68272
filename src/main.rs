use api_rest::AppState;
use hms_core::{
    BroadcastSink, ConflictReason, CoreConfig, HospitalError, HospitalService, NewRoom,
    config::{flag_from_env_value, load_room_seed, open_store, store_backend_from_env_value},
    constants::{DEFAULT_DATA_DIR, DEFAULT_EVENT_BUFFER},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the HMS application
///
/// Resolves configuration from the environment, opens the store, seeds rooms and serves the
/// REST API with its WebSocket event stream.
///
/// # Environment Variables
/// - `HMS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `HMS_DATA_DIR`: Directory for the file store (default: "hospital_data")
/// - `HMS_STORE`: `file` (default) or `memory`
/// - `HMS_EVENT_BUFFER`: Events buffered per WebSocket subscriber (default: 256)
/// - `HMS_AUTO_ALLOCATE`: Auto-allocate on admission (default: true)
/// - `HMS_SEED_ROOMS`: Optional YAML file of rooms to create at startup
/// - `API_KEY`: API key required on `/api/*`; unset disables the check
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hms=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("HMS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let event_buffer = match std::env::var("HMS_EVENT_BUFFER") {
        Ok(v) => v.trim().parse::<usize>()?,
        Err(_) => DEFAULT_EVENT_BUFFER,
    };
    let cfg = Arc::new(CoreConfig::new(
        PathBuf::from(std::env::var("HMS_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into())),
        store_backend_from_env_value(std::env::var("HMS_STORE").ok())?,
        event_buffer,
        flag_from_env_value(std::env::var("HMS_AUTO_ALLOCATE").ok(), true)?,
    )?);

    let store = open_store(&cfg)?;
    let events = BroadcastSink::new(cfg.event_buffer());
    let service = HospitalService::new(cfg.clone(), store, Arc::new(events.clone()));

    if let Ok(seed_path) = std::env::var("HMS_SEED_ROOMS") {
        let rooms = load_room_seed(&PathBuf::from(seed_path))?;
        let created = seed_rooms(&service, rooms)?;
        tracing::info!("++ Seeded {} room(s)", created);
    }

    let api_key: Option<Arc<str>> = std::env::var("API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
        .map(Arc::from);
    if api_key.is_none() {
        tracing::warn!("API_KEY not set; /api endpoints are unauthenticated");
    }

    let app = api_rest::router(AppState {
        service,
        events,
        api_key,
    });

    tracing::info!("++ Starting HMS REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- HMS stopped");
    Ok(())
}

/// Creates the seed rooms, skipping numbers that already exist.
///
/// # Returns
/// The number of rooms created.
fn seed_rooms(service: &HospitalService, rooms: Vec<NewRoom>) -> Result<usize, HospitalError> {
    let mut created = 0;
    for room in rooms {
        let number = room.room_number.clone();
        match service.create_room(room) {
            Ok(_) => created += 1,
            Err(HospitalError::Conflict(ConflictReason::DuplicateRoomNumber(_))) => {
                tracing::debug!("seed room {} already exists", number);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(created)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Shutdown signal error: {:?}", e);
    }
}
