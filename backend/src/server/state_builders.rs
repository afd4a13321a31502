//! Composition of the domain services, adapters and broker consumers.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};
use tracing::info;

use dispatch::domain::ports::{EventBroker, TripRepository};
use dispatch::domain::{
    DeliveryHandler, DriverAssignmentConsumer, EventKind, EventPublisher, NotificationHub,
    NotificationRelay, TripDispatchService, TripService,
};
use dispatch::inbound::http::state::HttpState;
use dispatch::inbound::ws::state::WsState;
use dispatch::outbound::memory::InMemoryTripRepository;
use dispatch::outbound::messaging::InMemoryBroker;
use dispatch::outbound::persistence::DieselTripRepository;

use super::ServerConfig;

/// A standing consumer and the event kinds it subscribes to.
pub(crate) struct StandingConsumer {
    pub handler: Arc<dyn DeliveryHandler>,
    pub kinds: &'static [EventKind],
}

/// Everything the server and its background tasks share.
pub(crate) struct Components {
    pub http_state: web::Data<HttpState>,
    pub ws_state: web::Data<WsState>,
    pub broker: InMemoryBroker,
    pub consumers: Vec<StandingConsumer>,
}

fn build_trip_repository(config: &ServerConfig) -> Arc<dyn TripRepository> {
    match &config.db_pool {
        Some(pool) => Arc::new(DieselTripRepository::new(pool.clone())),
        None => {
            info!("no database configured; trips are kept in memory");
            Arc::new(InMemoryTripRepository::default())
        }
    }
}

pub(crate) fn build_components(config: &ServerConfig) -> Components {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let broker = InMemoryBroker::new();
    let broker_port: Arc<dyn EventBroker> = Arc::new(broker.clone());
    let hub = Arc::new(NotificationHub::new());

    let trips = Arc::new(TripService::new(
        build_trip_repository(config),
        Arc::clone(&config.routes),
        config.pricing,
        clock.clone(),
    ));
    let publisher = Arc::new(EventPublisher::new(
        broker_port,
        clock,
        config.retry_policy,
    ));

    let dispatch = Arc::new(TripDispatchService::new(
        Arc::clone(&trips),
        Arc::clone(&publisher),
    ));
    let consumers = vec![
        StandingConsumer {
            handler: Arc::new(DriverAssignmentConsumer::new(
                trips,
                Arc::clone(&publisher),
                Arc::clone(&hub),
            )),
            kinds: &EventKind::DRIVER_ORIGIN,
        },
        StandingConsumer {
            handler: Arc::new(NotificationRelay::new(Arc::clone(&hub))),
            kinds: &EventKind::TRIP_LIFECYCLE,
        },
    ];

    Components {
        http_state: web::Data::new(HttpState::new(dispatch)),
        ws_state: web::Data::new(WsState::new(hub, publisher)),
        broker,
        consumers,
    }
}
