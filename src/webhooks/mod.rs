//! Webhook serving and registration.
//!
//! - [`server`]: the TLS admission endpoint backed by the [`crate::injector::Injector`]
//! - [`registration`]: the MutatingWebhookConfiguration routing pod creation to it

pub mod registration;
mod server;

pub use registration::{create_or_update_mutating_webhook_config, mutating_webhook_configuration};
pub use server::{
    MUTATE_PATH, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    create_webhook_router, run_webhook_server,
};
