//! Wargabot - conversational gateway for a neighborhood resident
//! information system.
//!
//! Inbound messages flow through the intake router: group messages are
//! dropped, `ping` is answered locally, everything else goes to the
//! language backend, is decoded into a structured command, and dispatched
//! to the resident-data or issue-tracking handlers. A bounded, time-limited
//! session memory keeps multi-turn exchanges coherent. An axum admin router
//! exposes a health probe and a token-guarded broadcast endpoint.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::io::{AsyncBufReadExt, BufReader};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod command;
mod config;
mod conversation;
mod core;
mod dispatch;
mod handlers;
mod intake;
mod providers;
mod routes;
mod transport;

use config::Config;
use crate::core::{Engine, SessionMemory};
use dispatch::Dispatcher;
use handlers::{SqlIssueTracker, SqlResidentData};
use intake::{InboundMessage, IntakeRouter};
use providers::GeminiClient;
use routes::AdminState;
use transport::{ChannelTransport, Transport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wargabot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    handlers::init_schema(&pool).await?;

    let memory = Arc::new(SessionMemory::new(
        config.memory_max_entries,
        config.memory_ttl(),
        config.memory_max_entry_bytes,
    ));

    let backend = Arc::new(GeminiClient::new(config.gemini_api_key.clone())?);
    let dispatcher = Dispatcher::new(
        Arc::new(SqlResidentData::new(pool.clone())),
        Arc::new(SqlIssueTracker::new(pool)),
    );
    let engine = Arc::new(Engine::new(backend, dispatcher, memory));

    // The real messaging transport is an external collaborator; replies go
    // through the channel seam and are drained to the log until an adapter
    // is plugged in.
    let (transport, mut outbound) = ChannelTransport::new();
    let transport: Arc<dyn Transport> = Arc::new(transport);
    tokio::spawn(async move {
        while let Some(msg) = outbound.recv().await {
            tracing::info!(recipient = %msg.recipient, text = %msg.text, "outbound reply");
        }
    });

    let router = Arc::new(IntakeRouter::new(engine, transport.clone()));

    // Dev feed: stdin lines act as inbound messages from a local operator,
    // one task per event, mirroring how a transport adapter delivers them.
    {
        let router = router.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                let router = router.clone();
                tokio::spawn(async move {
                    router.on_message(InboundMessage::text("console", line)).await;
                });
            }
        });
    }

    let state = AdminState {
        transport,
        broadcast_token: config.broadcast_token.clone(),
    };

    let app = routes::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    tracing::info!("wargabot admin API running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
