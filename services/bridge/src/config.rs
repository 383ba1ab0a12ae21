//! Normalizes CLI subcommand arguments into the `Config` the service wires
//! itself from. Keeping this separate from `cli.rs` means the service layer
//! never depends on `clap` types directly.

use crate::cli::{ListenArgs, StartArgs};

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt_broker_url: String,
    pub redis_url: Option<String>,
    pub publish_broker_url: Option<String>,
    pub http_port: Option<u16>,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

impl From<StartArgs> for Config {
    fn from(args: StartArgs) -> Self {
        Config {
            mqtt_broker_url: args.mqtt,
            redis_url: non_empty(args.redis),
            publish_broker_url: non_empty(args.publish),
            http_port: None,
        }
    }
}

impl From<ListenArgs> for Config {
    fn from(args: ListenArgs) -> Self {
        Config {
            mqtt_broker_url: args.broker,
            redis_url: non_empty(args.redis),
            publish_broker_url: non_empty(args.publish),
            http_port: if args.http == 0 { None } else { Some(args.http) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_redis_flag_means_store_sink_disabled() {
        let cfg: Config = StartArgs {
            mqtt: "mqtt://localhost:1883".to_string(),
            publish: String::new(),
            redis: String::new(),
        }
        .into();
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn zero_http_port_means_no_dashboard() {
        let cfg: Config = ListenArgs {
            broker: "mqtt://localhost:1883".to_string(),
            publish: String::new(),
            redis: String::new(),
            http: 0,
        }
        .into();
        assert!(cfg.http_port.is_none());
    }
}
