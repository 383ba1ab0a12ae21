//! CLI surface: `start`, `listen`, and `opcua` subcommands, matching the
//! source's Cobra command tree one-for-one (flag names, defaults, and
//! short forms preserved; `clap` derive replaces Cobra).

use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "glowplug", version = crate::version::VERSION_STRING, about = "Sparkplug B to Redis/MQTT/WebSocket bridge")]
pub struct Cli {
    /// Log level filter, e.g. `info`, `debug`, `glowplug=debug,tower=warn`.
    /// `RUST_LOG` takes precedence when set.
    #[arg(long = "log-level", env = "GLOWPLUG_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start glowplug: read Sparkplug B over MQTT, optionally republish and store.
    Start(StartArgs),
    /// Listen for Sparkplug messages, with an optional WebSocket/HTTP dashboard.
    Listen(ListenArgs),
    /// Start the glowplug OPC UA client.
    Opcua(OpcuaArgs),
}

#[derive(Debug, Parser)]
pub struct StartArgs {
    /// MQTT broker URL to listen for Sparkplug messages.
    #[arg(short = 'm', long = "mqtt", env = "GLOWPLUG_MQTT", default_value = "mqtt://localhost:1883")]
    pub mqtt: String,

    /// Publish human readable Sparkplug metric values to this MQTT broker.
    #[arg(short = 'p', long = "publish", env = "GLOWPLUG_PUBLISH", default_value = "")]
    pub publish: String,

    /// Redis URL to store Sparkplug data, e.g. redis://localhost:6379/0
    #[arg(short = 'r', long = "redis", env = "GLOWPLUG_REDIS", default_value = "")]
    pub redis: String,
}

#[derive(Debug, Parser)]
pub struct ListenArgs {
    /// MQTT broker URL to listen for Sparkplug messages.
    #[arg(short = 'b', long = "broker", default_value = "mqtt://localhost:1883")]
    pub broker: String,

    /// Publish human readable Sparkplug metric values to this MQTT broker.
    #[arg(short = 'p', long = "publish", default_value = "")]
    pub publish: String,

    /// Redis URL to store Sparkplug data, e.g. redis://localhost:6379/0
    #[arg(short = 'r', long = "redis", default_value = "")]
    pub redis: String,

    /// HTTP port that exposes Sparkplug data over WebSockets.
    #[arg(short = 'w', long = "http", default_value_t = 0)]
    pub http: u16,
}

#[derive(Debug, Parser)]
pub struct OpcuaArgs {
    /// Redis URL to store OPC UA node data.
    #[arg(short = 'r', long = "redis", default_value = "redis://localhost:6379/0")]
    pub redis: String,

    /// JSON array of node ids to subscribe to, e.g. ["ns=3;i=1005"]
    #[arg(short = 'n', long = "nodes", default_value = "")]
    pub nodes: String,

    /// OPC UA server endpoint, e.g. opc.tcp://localhost:53530/OPCUA/SimulationServer
    #[arg(short = 'e', long = "endpoint", default_value = "")]
    pub endpoint: String,

    /// Security policy: None, Basic128Rsa15, Basic256, Basic256Sha256.
    #[arg(short = 'p', long = "policy", default_value = "Basic256Sha256")]
    pub policy: String,

    /// Subscription interval.
    #[arg(short = 'i', long = "interval", default_value = "100ms", value_parser = parse_duration)]
    pub interval: Duration,

    /// Path to the client certificate. Required when policy/mode != None.
    #[arg(short = 'c', long = "cert", default_value = "cert/public.der")]
    pub cert: String,

    /// Path to the client private key. Required when policy/mode != None.
    #[arg(short = 'k', long = "key", default_value = "cert/default_pk.pem")]
    pub key: String,

    /// Security mode: auto, None, Sign, SignAndEncrypt.
    #[arg(short = 'm', long = "mode", default_value = "auto")]
    pub mode: String,

    /// Publish human readable OPC UA node data to this MQTT broker.
    #[arg(short = 'q', long = "mqtt", default_value = "")]
    pub mqtt: String,
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_like_parse(s).ok_or_else(|| format!("invalid duration: {s}"))
}

/// Parses simple `<number><unit>` durations (`ms`, `s`), matching the
/// shapes the source accepts from Go's `time.ParseDuration`.
fn humantime_like_parse(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(digits) = s.strip_suffix("ms") {
        return digits.parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(digits) = s.strip_suffix('s') {
        return digits.parse::<f64>().ok().map(Duration::from_secs_f64);
    }
    s.parse::<u64>().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_millisecond_durations() {
        assert_eq!(humantime_like_parse("250ms"), Some(Duration::from_millis(250)));
    }

    #[test]
    fn parses_second_durations() {
        assert_eq!(humantime_like_parse("2s"), Some(Duration::from_secs(2)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(humantime_like_parse("not-a-duration"), None);
    }

    #[test]
    fn log_level_defaults_to_info_and_accepts_any_subcommand() {
        let cli = Cli::parse_from(["glowplug", "start"]);
        assert_eq!(cli.log_level, "info");
        assert!(matches!(cli.command, Command::Start(_)));
    }

    #[test]
    fn global_log_level_flag_works_after_subcommand() {
        let cli = Cli::parse_from(["glowplug", "--log-level", "debug", "listen", "--http", "8080"]);
        assert_eq!(cli.log_level, "debug");
        match cli.command {
            Command::Listen(args) => assert_eq!(args.http, 8080),
            _ => panic!("expected listen"),
        }
    }
}
