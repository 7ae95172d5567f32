pub mod adapters;
pub mod domain;
pub mod services;

use {crate::services::orchestrator::PaymentOrchestrator, std::sync::Arc};

#[derive(Clone)]
pub struct AppState {
    pub mpesa: Arc<PaymentOrchestrator>,
    pub pesapal: Arc<PaymentOrchestrator>,
}
