use std::sync::Arc;

use hazard_engine::HazardGenerator;
use tokio::net::TcpListener;

mod config;
mod error;
mod routes;
mod simulate;
mod store;
mod types;

use config::ServiceConfig;
use routes::AppState;
use store::HazardStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging (RUST_LOG=info)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServiceConfig::from_env()?;

    let store = HazardStore::new();
    if config.seed_hazards > 0 {
        let mut generator = match config.rng_seed {
            Some(seed) => HazardGenerator::seeded(seed),
            None => HazardGenerator::new(),
        }
        .starting_at(store.next_id());
        store.extend(generator.generate(config.seed_hazards));
        tracing::info!("seeded {} synthetic hazards", store.len());
    }

    let bind_addr = config.bind_addr.clone();
    let app = routes::router(AppState {
        store,
        config: Arc::new(config),
    });

    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("speed service listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
