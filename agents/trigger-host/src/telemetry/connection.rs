//! Ingestion connection string parsing

use super::{Result, TelemetryError};

/// Endpoint used when the connection string names none.
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Parsed `Key=Value;...` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub instrumentation_key: String,
    /// Base URL without trailing slash
    pub ingestion_endpoint: String,
}

impl ConnectionString {
    /// Parse a connection string. Keys are case-insensitive.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;

        for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                TelemetryError::ConfigError(format!("malformed connection string entry: {}", pair))
            })?;

            match key.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.trim().to_string()),
                "ingestionendpoint" => {
                    ingestion_endpoint = Some(value.trim().trim_end_matches('/').to_string())
                }
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TelemetryError::ConfigError(
                    "connection string has no InstrumentationKey".to_string(),
                )
            })?;

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint: ingestion_endpoint
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string()),
        })
    }

    /// Track URL the ingestion client posts to.
    pub fn track_url(&self) -> String {
        format!("{}/v2/track", self.ingestion_endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_connection_string() {
        let cs = ConnectionString::parse(
            "InstrumentationKey=00000000-0000-0000-0000-000000000000;IngestionEndpoint=https://westeurope-5.in.applicationinsights.azure.com/;LiveEndpoint=https://westeurope.livediagnostics.monitor.azure.com/",
        )
        .unwrap();

        assert_eq!(cs.instrumentation_key, "00000000-0000-0000-0000-000000000000");
        assert_eq!(
            cs.track_url(),
            "https://westeurope-5.in.applicationinsights.azure.com/v2/track"
        );
    }

    #[test]
    fn test_default_endpoint_and_case() {
        let cs = ConnectionString::parse("instrumentationkey=abc").unwrap();
        assert_eq!(cs.ingestion_endpoint, DEFAULT_INGESTION_ENDPOINT);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(ConnectionString::parse("InstrumentationKey").is_err());
        assert!(ConnectionString::parse("IngestionEndpoint=https://x").is_err());
        assert!(ConnectionString::parse("InstrumentationKey=").is_err());
    }
}
