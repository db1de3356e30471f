//! [`DataSource`] implementations for HTTP endpoints and local files.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use ev_map_source_models::{SourceDefinition, SourceLocation};

use crate::{DataSource, SourceError};

/// Per-request timeout. Boundary files for all US counties run to tens of
/// megabytes, so this is generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const USER_AGENT: &str = "Mozilla/5.0 (compatible; EvMap/1.0; +https://github.com)";

/// Builds the `reqwest::Client` shared by all HTTP sources in a run.
///
/// # Errors
///
/// Returns [`SourceError`] if the client cannot be built.
pub fn build_http_client() -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(Into::into)
}

/// Fetches a payload with a single HTTP GET.
pub struct HttpSource {
    id: String,
    name: String,
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    /// Creates an HTTP source.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            client,
        }
    }
}

#[async_trait]
impl DataSource for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        log::debug!("{}: GET {}", self.id, self.url);
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        log::debug!("{}: received {} bytes", self.id, body.len());
        Ok(body.to_vec())
    }
}

/// Reads a payload from the local filesystem.
pub struct FileSource {
    id: String,
    name: String,
    path: PathBuf,
}

impl FileSource {
    /// Creates a file source.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl DataSource for FileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        log::debug!("{}: reading {}", self.id, self.path.display());
        Ok(tokio::fs::read(&self.path).await?)
    }
}

/// Builds the [`DataSource`] described by a source definition.
#[must_use]
pub fn source_from_definition(
    definition: &SourceDefinition,
    client: &reqwest::Client,
) -> Box<dyn DataSource> {
    match &definition.location {
        SourceLocation::Http { url } => Box::new(HttpSource::new(
            &definition.id,
            &definition.name,
            url,
            client.clone(),
        )),
        SourceLocation::File { path } => Box::new(FileSource::new(
            &definition.id,
            &definition.name,
            path.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ev_map_source_models::RetryPolicy;

    #[tokio::test]
    async fn file_source_reads_payload() {
        let path = std::env::temp_dir().join(format!(
            "ev_map_file_source_test_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, b"[]").unwrap();

        let source = FileSource::new("local", "Local fixture", &path);
        assert_eq!(source.fetch().await.unwrap(), b"[]");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn file_source_reports_missing_file() {
        let source = FileSource::new(
            "missing",
            "Missing fixture",
            std::env::temp_dir().join(format!("ev_map_missing_{}.json", std::process::id())),
        );
        assert!(matches!(source.fetch().await, Err(SourceError::Io(_))));
    }

    #[test]
    fn builds_sources_from_definitions() {
        let client = build_http_client().unwrap();

        let http = SourceDefinition {
            id: "stations".to_string(),
            name: "Stations".to_string(),
            location: SourceLocation::Http {
                url: "https://example.com/stations.json".to_string(),
            },
            retry: RetryPolicy::default(),
        };
        let source = source_from_definition(&http, &client);
        assert_eq!(source.id(), "stations");
        assert_eq!(source.name(), "Stations");

        let file = SourceDefinition {
            id: "population".to_string(),
            name: "Population".to_string(),
            location: SourceLocation::File {
                path: PathBuf::from("data/population.json"),
            },
            retry: RetryPolicy::default(),
        };
        assert_eq!(source_from_definition(&file, &client).id(), "population");
    }
}
