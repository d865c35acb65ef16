//! ClickHouse-backed query executor

use crate::errors::{retrieval_error, Result};
use crate::executor::{QueryExecutor, RecordRow};
use async_trait::async_trait;
use clickhouse::{Client, Compression, Row};
use ndiff_core::EndpointConfig;
use serde::Deserialize;

/// Server-side limit on a single range query, in seconds
const MAX_EXECUTION_TIME_SECS: &str = "60";

#[derive(Debug, Row, Deserialize)]
struct NftRow {
    txid: String,
    height: u32,
    nftidx: u64,
    nfttype: u8,
}

impl From<NftRow> for RecordRow {
    fn from(row: NftRow) -> Self {
        RecordRow {
            key: row.txid,
            height: u64::from(row.height),
            index: row.nftidx,
            kind: row.nfttype,
        }
    }
}

/// A long-lived connection to one ClickHouse database
pub struct ClickHouseExecutor {
    name: String,
    client: Client,
}

impl ClickHouseExecutor {
    /// Build the client and ping it once so a bad endpoint fails at startup.
    pub async fn connect(name: impl Into<String>, endpoint: &EndpointConfig) -> Result<Self> {
        let name = name.into();
        let mut client = Client::default()
            .with_url(endpoint_url(&endpoint.address))
            .with_database(&endpoint.database)
            .with_compression(Compression::Lz4)
            .with_option("max_execution_time", MAX_EXECUTION_TIME_SECS);
        if let Some(user) = &endpoint.user {
            client = client.with_user(user);
        }
        if let Some(password) = &endpoint.password {
            client = client.with_password(password.expose());
        }

        client
            .query("SELECT 1")
            .execute()
            .await
            .map_err(|e| retrieval_error("ping", &name, format!("failed to ping store: {}", e)))?;

        tracing::info!(
            component = module_path!(),
            source = %name,
            database = %endpoint.database,
            "store connection ready"
        );

        Ok(Self { name, client })
    }
}

#[async_trait]
impl QueryExecutor for ClickHouseExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn query_range(&self, sql: &str, lower: u64, upper: u64) -> Result<Vec<RecordRow>> {
        let rows = self
            .client
            .query(sql)
            .bind(lower)
            .bind(upper)
            .fetch_all::<NftRow>()
            .await
            .map_err(|e| retrieval_error("query_range", &self.name, e.to_string()))?;

        Ok(rows.into_iter().map(RecordRow::from).collect())
    }
}

/// The HTTP client needs a scheme; bare `host:port` addresses get `http://`.
fn endpoint_url(address: &str) -> String {
    if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_adds_scheme() {
        assert_eq!(endpoint_url("ch-old:8123"), "http://ch-old:8123");
        assert_eq!(endpoint_url("https://ch:8443"), "https://ch:8443");
    }

    #[test]
    fn test_row_conversion_widens_height() {
        let row = RecordRow::from(NftRow {
            txid: "ab".to_string(),
            height: u32::MAX,
            nftidx: 7,
            nfttype: 5,
        });
        assert_eq!(row.height, u64::from(u32::MAX));
        assert_eq!(row.kind, 5);
    }
}
