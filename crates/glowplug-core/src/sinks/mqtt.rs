//! MQTT republish sink: fire-and-forget, QoS 0, non-retained, exactly
//! mirroring the source's detached `go func` publish per metric.

use rumqttc::{AsyncClient, QoS};
use tracing::warn;

pub struct MqttSink {
    client: AsyncClient,
}

impl MqttSink {
    pub fn new(client: AsyncClient) -> Self {
        MqttSink { client }
    }

    /// Spawns a detached publish task; publish failures are logged, never
    /// propagated, since nothing downstream of the bridge can act on them.
    pub fn publish_detached(&self, topic: String, payload: Vec<u8>) {
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client
                .publish(topic.clone(), QoS::AtMostOnce, false, payload)
                .await
            {
                warn!(topic, error = %e, "mqtt republish failed");
            }
        });
    }
}
