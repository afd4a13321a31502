//! Server construction, middleware wiring and background consumers.

mod config;
mod state_builders;

pub use config::ServerConfig;

use state_builders::{Components, build_components};

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};
use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use dispatch::Trace;
#[cfg(debug_assertions)]
use dispatch::doc::ApiDoc;
use dispatch::domain::ports::EventBroker;
use dispatch::domain::run_consumer;
use dispatch::inbound::http::error::json_config;
use dispatch::inbound::http::health::{HealthState, live, ready};
use dispatch::inbound::http::state::HttpState;
use dispatch::inbound::http::trips::{cancel_trip, preview_trip, start_trip};
use dispatch::inbound::ws;
use dispatch::inbound::ws::state::WsState;
use dispatch::outbound::messaging::InMemoryBroker;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Standing broker consumers plus the token that stops them.
pub struct BackgroundTasks {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    broker: InMemoryBroker,
}

impl BackgroundTasks {
    /// Stop the consumers after their in-flight delivery, then close the
    /// broker.
    pub async fn shutdown(self) {
        self.token.cancel();
        for result in join_all(self.handles).await {
            if let Err(err) = result {
                error!(error = %err, "consumer task failed");
            }
        }
        self.broker.shutdown();
        info!("background consumers stopped");
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        ws_state,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .app_data(json_config())
        .wrap(Trace)
        .service(preview_trip)
        .service(start_trip)
        .service(cancel_trip)
        .service(ws::driver_entry)
        .service(ws::rider_entry)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

async fn spawn_consumers(components: &mut Components) -> std::io::Result<BackgroundTasks> {
    let token = CancellationToken::new();
    let mut handles = Vec::with_capacity(components.consumers.len());
    for consumer in components.consumers.drain(..) {
        let name = consumer.handler.name();
        let subscription = components
            .broker
            .subscribe(consumer.kinds)
            .await
            .map_err(|err| std::io::Error::other(format!("subscribe {name}: {err}")))?;
        handles.push(tokio::spawn(run_consumer(
            consumer.handler,
            subscription,
            token.clone(),
        )));
    }
    Ok(BackgroundTasks {
        token,
        handles,
        broker: components.broker.clone(),
    })
}

/// Construct the HTTP server and start the broker consumers.
///
/// The health state is marked ready once both are running.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket or subscribing a
/// consumer fails.
pub async fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<(Server, BackgroundTasks)> {
    let mut components = build_components(&config);
    let background = spawn_consumers(&mut components).await?;

    let deps = AppDependencies {
        health_state: health_state.clone(),
        http_state: components.http_state.clone(),
        ws_state: components.ws_state.clone(),
    };
    let server = HttpServer::new(move || build_app(deps.clone()))
        .bind(config.bind_addr)?
        .run();

    health_state.mark_ready();
    Ok((server, background))
}
