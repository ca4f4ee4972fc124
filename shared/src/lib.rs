pub mod accounts;
pub mod auth;
pub mod error;
pub mod identity;
pub mod registration;
pub mod repository;
pub mod schema;
pub mod store;
pub mod types;

use crate::accounts::UserAccountStore;
use crate::auth::AuthenticationGateway;
use crate::identity::IdentityProvider;
use crate::registration::RegistrationWorkflow;
use crate::repository::ResourceRepository;
use crate::schema::EntitySchema;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
}

impl AppState {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Arc<Self> {
        Arc::new(Self { identity, store })
    }

    pub fn accounts(&self) -> UserAccountStore {
        UserAccountStore::new(Arc::clone(&self.store))
    }

    pub fn registration(&self) -> RegistrationWorkflow {
        RegistrationWorkflow::new(Arc::clone(&self.identity), self.accounts())
    }

    pub fn gateway(&self) -> AuthenticationGateway {
        AuthenticationGateway::new(Arc::clone(&self.identity), self.accounts())
    }

    pub fn repository(&self, schema: &'static EntitySchema) -> ResourceRepository {
        ResourceRepository::new(schema, Arc::clone(&self.store))
    }
}
