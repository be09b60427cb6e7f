/// Network adapters for external API calls
mod caching_registry_client;
mod http;
mod multi_registry_client;
mod npm_client;
mod osv_client;
mod pypi_client;

pub use caching_registry_client::CachingRegistryClient;
pub use multi_registry_client::MultiRegistryClient;
pub use npm_client::NpmRegistryClient;
pub use osv_client::OsvVulnerabilitySource;
pub use pypi_client::PyPiRegistryClient;
