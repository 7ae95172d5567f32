use {
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    std::{sync::Arc, time::Duration},
    tiba_pay::{
        AppState,
        adapters::{
            daraja::{DarajaConfig, DarajaGateway},
            http as payment_routes,
            pesapal::{PesapalConfig, PesapalGateway},
        },
        domain::status::CodeTable,
        services::{orchestrator::PaymentOrchestrator, poller::PollerConfig},
    },
    tokio::signal,
    tower_http::timeout::TimeoutLayer,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("failed to build http client");

    let poller = PollerConfig::from_env();
    // Request timeout must sit above the polling ceiling: the push
    // route answers only once the confirmation loop has resolved.
    let request_ceiling = poller.interval * poller.max_attempts + Duration::from_secs(30);

    let mpesa = Arc::new(PaymentOrchestrator::new(
        Arc::new(DarajaGateway::new(http.clone(), DarajaConfig::from_env())),
        CodeTable::mpesa(),
        poller.clone(),
    ));
    let pesapal = Arc::new(PaymentOrchestrator::new(
        Arc::new(PesapalGateway::new(http, PesapalConfig::from_env())),
        CodeTable::pesapal(),
        poller,
    ));

    spawn_update_logger(&mpesa);
    spawn_update_logger(&pesapal);

    let state = AppState { mpesa, pesapal };

    let app = Router::new()
        .route("/", get(|| async { "ok" }))
        .route(
            "/payments/mpesa/stk-push",
            post(payment_routes::stk_push_handler),
        )
        .route(
            "/payments/mpesa/status/{checkout_id}",
            get(payment_routes::mpesa_status_handler),
        )
        .route(
            "/payments/mpesa/reset/{reference}",
            post(payment_routes::mpesa_reset_handler),
        )
        .route(
            "/payments/pesapal/initiate",
            post(payment_routes::pesapal_initiate_handler),
        )
        .route(
            "/payments/pesapal/status/{tracking_id}",
            get(payment_routes::pesapal_status_handler),
        )
        .layer(DefaultBodyLimit::max(16 * 1024))
        .layer(TimeoutLayer::new(request_ceiling))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("listening on 0.0.0.0:3000");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

fn spawn_update_logger(orchestrator: &Arc<PaymentOrchestrator>) {
    let mut updates = orchestrator.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let update = updates.borrow_and_update().clone();
            if !update.message.is_empty() {
                tracing::info!(reference = %update.reference, "{}", update.message);
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
