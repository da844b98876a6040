//! Client HTTP du service de couvertures distant
//!
//! Le service est un simple point d'accès GET paramétré par région et
//! identifiant de titre : il renvoie les octets de l'image ou un statut
//! non 2xx. Aucune autre sémantique n'est supposée.

use crate::decode::{CoverDecoder, ImageDecoder};
use crate::error::FetchError;
use crate::item::LibraryItem;
use crate::source::{CoverArtifact, Provenance};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Gabarit par défaut de l'URL de recherche
pub const DEFAULT_LOOKUP_URL: &str = "https://art.gametdb.com/wii/cover/{region}/{title_id}.png";

/// Délai par défaut d'une requête
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent par défaut
pub const DEFAULT_USER_AGENT: &str = concat!("boxartcovers/", env!("CARGO_PKG_VERSION"));

/// Collaborateur de recherche distante
///
/// Une seule recherche est en cours à la fois par résolution ; le contrôleur
/// traite toute erreur comme un échec doux et passe à la région suivante.
#[async_trait]
pub trait CoverFetcher: Send + Sync {
    async fn fetch(&self, region: &str, item: &LibraryItem) -> Result<CoverArtifact, FetchError>;
}

/// Construit l'URL de recherche à partir d'un gabarit
///
/// Les marqueurs `{region}` et `{title_id}` sont substitués.
pub fn build_lookup_url(template: &str, region: &str, title_id: &str) -> String {
    template
        .replace("{region}", region)
        .replace("{title_id}", title_id)
}

/// Client du service de couvertures (GameTDB par défaut)
///
/// # Example
///
/// ```no_run
/// use boxartcovers::{CoverFetcher, GameTdbClient, LibraryItem};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GameTdbClient::builder().build()?;
/// let item = LibraryItem::new("/games/Zelda.iso", "GZLE01", "US");
/// let cover = client.fetch("US", &item).await?;
/// println!("{} bytes", cover.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct GameTdbClient {
    client: Client,
    url_template: String,
    decoder: Arc<dyn CoverDecoder>,
}

impl GameTdbClient {
    /// Create a builder for configuring the client
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Gabarit d'URL utilisé par ce client
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// URL de recherche d'un élément pour une région
    pub fn lookup_url(&self, region: &str, item: &LibraryItem) -> String {
        build_lookup_url(&self.url_template, region, &item.title_id)
    }
}

#[async_trait]
impl CoverFetcher for GameTdbClient {
    async fn fetch(&self, region: &str, item: &LibraryItem) -> Result<CoverArtifact, FetchError> {
        if item.title_id.is_empty() {
            return Err(FetchError::MissingTitleId(item.path.clone()));
        }

        let url = self.lookup_url(region, item);
        let url = reqwest::Url::parse(&url).map_err(|_| FetchError::InvalidUrl(url.clone()))?;
        tracing::debug!(%url, region, "Fetching cover");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        // Décodage complet hors du runtime asynchrone
        let decoder = Arc::clone(&self.decoder);
        let payload = bytes.clone();
        let info = tokio::task::spawn_blocking(move || decoder.decode(&payload))
            .await
            .map_err(|e| FetchError::Task(e.to_string()))??;

        Ok(CoverArtifact::new(bytes, Provenance::Remote(region.to_string()))
            .with_dimensions(info.width, info.height))
    }
}

/// Builder for [`GameTdbClient`]
pub struct ClientBuilder {
    client: Option<Client>,
    url_template: String,
    timeout: Duration,
    user_agent: String,
    decoder: Arc<dyn CoverDecoder>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            client: None,
            url_template: DEFAULT_LOOKUP_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            decoder: Arc::new(ImageDecoder),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom HTTP client (timeout and user agent are then ignored)
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the lookup URL template (`{region}` and `{title_id}` are substituted)
    pub fn url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the decoder used to validate payloads
    pub fn decoder(mut self, decoder: Arc<dyn CoverDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<GameTdbClient, FetchError> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .user_agent(&self.user_agent)
                .timeout(self.timeout)
                .build()?,
        };

        Ok(GameTdbClient {
            client,
            url_template: self.url_template,
            decoder: self.decoder,
        })
    }
}
