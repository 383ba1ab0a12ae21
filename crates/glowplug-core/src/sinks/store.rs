//! Redis key/value store sink: one pipelined `SET` + `PUBLISH` per metric,
//! plus a one-time `HSET` into the typename hash on first sighting.
//!
//! Grounded on the source's `redis.go`/`worker.go` pipeline shape, adapted to
//! `redis`'s async `ConnectionManager`, which reconnects transparently and is
//! cheap to clone per call.

use crate::error::{Error, Result};

const TYPES_HASH_KEY: &str = "glowplug:metric_types";

pub struct StoreSink {
    conn: redis::aio::ConnectionManager,
}

impl StoreSink {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::StoreCommandError(e.to_string()))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::StoreCommandError(e.to_string()))?;
        Ok(StoreSink { conn })
    }

    /// Writes a metric's canonical JSON value, publishing it on the key's own
    /// pub/sub channel and recording the metric's typename on first sighting.
    pub async fn write(
        &self,
        key: &str,
        json_bytes: &[u8],
        first_seen: bool,
        typename: &str,
    ) -> Result<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        if first_seen {
            pipe.hset(TYPES_HASH_KEY, key, typename).ignore();
        }
        pipe.set(key, json_bytes).ignore();
        pipe.publish(key, json_bytes).ignore();

        let mut conn = self.conn.clone();
        pipe.query_async::<()>(&mut conn)
            .await
            .map_err(|e| Error::StoreCommandError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_malformed_url() {
        let result = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(StoreSink::connect("not-a-redis-url"));
        assert!(result.is_err());
    }
}
