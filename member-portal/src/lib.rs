pub mod access;
pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;

use services::{
    documents::DocumentRepository, identity::IdentityGateway, notify::NotificationSink,
    profiles::ProfileStore,
};
use std::sync::Arc;

/// Shared application state: the identity gateway, the two stores and the
/// notification sink, all behind their capability traits.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityGateway>,
    pub profiles: Arc<dyn ProfileStore>,
    pub documents: Arc<DocumentRepository>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityGateway>,
        profiles: Arc<dyn ProfileStore>,
        documents: Arc<DocumentRepository>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            identity,
            profiles,
            documents,
            notifier,
        }
    }
}
