//! Search index configuration
//!
//! Endpoint, credentials, field names and scroll tuning for the remote index.
//! The defaults describe the public OpenDataSUS immunization index.

use std::time::Duration;

/// Public OpenDataSUS Elasticsearch endpoint
pub const OPENDATASUS_HOST: &str = "https://imunizacao-es.saude.gov.br";

/// Index holding immunization events
pub const OPENDATASUS_INDEX: &str = "desc-imunizacao";

/// Public read-only user published by the Brazilian Ministry of Health
pub const OPENDATASUS_USER: &str = "imunizacao_public";

/// Password for [`OPENDATASUS_USER`], published alongside it
pub const OPENDATASUS_PASSWORD: &str = "qlto5t&7r_@+#Tlstigi";

/// Field holding the establishment's region code
pub const REGION_FIELD: &str = "estabelecimento_uf";

/// Field holding the vaccination date
pub const DATE_FIELD: &str = "vacina_dataAplicacao";

/// Hits requested per scroll page
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// How long the index keeps a scroll context alive between pages
pub const DEFAULT_SCROLL_KEEP_ALIVE: &str = "2m";

/// Per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Credentials presented to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexAuth {
    /// No credentials
    None,
    /// HTTP basic authentication
    Basic {
        /// User name
        username: String,
        /// Password
        password: String,
    },
    /// Bearer token
    Bearer(String),
}

/// Configuration of the remote search index
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Base URL, without trailing slash
    pub host: String,
    /// Index name
    pub index: String,
    /// Credentials
    pub auth: IndexAuth,
    /// Exact-match region field
    pub region_field: String,
    /// Date field the window range applies to
    pub date_field: String,
    /// Hits per scroll page
    pub page_size: usize,
    /// Scroll context keep-alive (Elasticsearch time unit, e.g. `2m`)
    pub scroll_keep_alive: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries for transient request failures
    pub max_retries: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: OPENDATASUS_HOST.to_string(),
            index: OPENDATASUS_INDEX.to_string(),
            auth: IndexAuth::Basic {
                username: OPENDATASUS_USER.to_string(),
                password: OPENDATASUS_PASSWORD.to_string(),
            },
            region_field: REGION_FIELD.to_string(),
            date_field: DATE_FIELD.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            scroll_keep_alive: DEFAULT_SCROLL_KEEP_ALIVE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: crate::extractor::config::DEFAULT_MAX_RETRIES,
        }
    }
}

impl IndexConfig {
    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.host.trim_end_matches('/')
    }

    /// Path of the initial search request
    pub fn search_path(&self) -> String {
        format!("/{}/_search", self.index)
    }
}
