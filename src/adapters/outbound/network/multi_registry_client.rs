use crate::analysis::domain::{Ecosystem, PackageMetadata};
use crate::ports::outbound::RegistryClient;
use crate::shared::error::AnalysisError;
use crate::shared::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Routes metadata lookups to the registry client registered for each ecosystem
#[derive(Default)]
pub struct MultiRegistryClient {
    clients: HashMap<Ecosystem, Arc<dyn RegistryClient>>,
}

impl MultiRegistryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, ecosystem: Ecosystem, client: Arc<dyn RegistryClient>) -> Self {
        self.clients.insert(ecosystem, client);
        self
    }
}

#[async_trait]
impl RegistryClient for MultiRegistryClient {
    async fn fetch_metadata(&self, ecosystem: &Ecosystem, name: &str) -> Result<PackageMetadata> {
        match self.clients.get(ecosystem) {
            Some(client) => client.fetch_metadata(ecosystem, name).await,
            None => Err(AnalysisError::MetadataUnavailable {
                package: name.to_string(),
                reason: format!("no registry configured for {}", ecosystem),
            }
            .into()),
        }
    }
}
