//! Builders wiring repositories and services into adapter state.

use std::sync::Arc;

use mockable::DefaultClock;

use groupstudy::domain::ports::StudyGroupRepository;
use groupstudy::domain::{
    ChatService, SignalService, StudyGroupCommandService, StudyGroupQueryService,
};
use groupstudy::inbound::http::state::HttpState;
use groupstudy::inbound::ws::{AllowedOrigins, ConnectionHub, WsState};
use groupstudy::outbound::memory::InMemoryStudyGroupRepository;
use groupstudy::outbound::persistence::DieselStudyGroupRepository;
use groupstudy::outbound::presence::DashMapPresenceRegistry;
use tracing::info;

use super::ServerConfig;

/// State handed to every worker's app.
pub(crate) struct AdapterStates {
    pub http: HttpState,
    pub ws: WsState,
}

/// Build adapter state backed by PostgreSQL when a pool is configured,
/// otherwise by the in-memory repository.
pub(crate) fn build_adapter_states(config: &ServerConfig) -> AdapterStates {
    let origins = config.allowed_origins.clone();
    match &config.db_pool {
        Some(pool) => {
            info!("study groups persist in PostgreSQL");
            build_with_repository(
                Arc::new(DieselStudyGroupRepository::new(pool.clone())),
                config.max_write_attempts,
                origins,
            )
        }
        None => {
            info!("no database configured; study groups live in memory");
            build_with_repository(
                Arc::new(InMemoryStudyGroupRepository::new()),
                config.max_write_attempts,
                origins,
            )
        }
    }
}

fn build_with_repository<R>(
    repository: Arc<R>,
    max_write_attempts: u32,
    origins: AllowedOrigins,
) -> AdapterStates
where
    R: StudyGroupRepository + 'static,
{
    let clock = Arc::new(DefaultClock);
    let presence = Arc::new(DashMapPresenceRegistry::new());
    let hub = Arc::new(ConnectionHub::new());

    let commands = StudyGroupCommandService::new(Arc::clone(&repository), clock.clone())
        .with_max_attempts(max_write_attempts);
    let queries = StudyGroupQueryService::new(Arc::clone(&repository));
    let chat = ChatService::new(
        Arc::clone(&repository),
        Arc::clone(&presence),
        Arc::clone(&hub),
        clock,
    );
    let signals = SignalService::new(repository, presence, Arc::clone(&hub));

    AdapterStates {
        http: HttpState::new(Arc::new(commands), Arc::new(queries)),
        ws: WsState::new(Arc::new(chat), Arc::new(signals), hub, origins),
    }
}
