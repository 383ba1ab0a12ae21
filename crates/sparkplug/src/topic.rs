//! Sparkplug topic grammar: parsing, validation, and composition.
//!
//! Topics are validated against a fixed allow-list of nine shapes, one per
//! command plus `STATE`, all rooted at the literal namespace `spBv1.0`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

const NAMESPACE: &str = "spBv1.0";

/// A Sparkplug B command (message type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    NBirth,
    NDeath,
    NData,
    NCmd,
    DBirth,
    DDeath,
    DData,
    DCmd,
    State,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::NBirth => "NBIRTH",
            Command::NDeath => "NDEATH",
            Command::NData => "NDATA",
            Command::NCmd => "NCMD",
            Command::DBirth => "DBIRTH",
            Command::DDeath => "DDEATH",
            Command::DData => "DDATA",
            Command::DCmd => "DCMD",
            Command::State => "STATE",
        }
    }

    /// True for the four device-scoped commands; a device-scoped topic
    /// always carries a device identifier.
    pub fn has_device(self) -> bool {
        matches!(
            self,
            Command::DBirth | Command::DDeath | Command::DData | Command::DCmd
        )
    }

    /// True for `NBIRTH`/`NDATA`/`DBIRTH`/`DDATA` — the only commands whose
    /// payload the worker pool decodes (see `glowplug_core::worker`).
    pub fn carries_metrics(self) -> bool {
        matches!(
            self,
            Command::NBirth | Command::NData | Command::DBirth | Command::DData
        )
    }

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NBIRTH" => Ok(Command::NBirth),
            "NDEATH" => Ok(Command::NDeath),
            "NDATA" => Ok(Command::NData),
            "NCMD" => Ok(Command::NCmd),
            "DBIRTH" => Ok(Command::DBirth),
            "DDEATH" => Ok(Command::DDeath),
            "DDATA" => Ok(Command::DData),
            "DCMD" => Ok(Command::DCmd),
            "STATE" => Ok(Command::State),
            other => Err(Error::InvalidTopic(format!("unknown command: {other}"))),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A parsed Sparkplug topic. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub command: Command,
    pub group_id: String,
    pub edge_node_id: String,
    pub device_id: Option<String>,
    pub has_device: bool,
    pub scada_node_id: Option<String>,
}

/// `[A-Za-z0-9][A-Za-z0-9_.\-:]*` — begins with an alphanumeric, no MQTT
/// reserved characters (`+`, `#`, `/`) anywhere in the component. `:` is
/// permitted: the worked examples use it to pack a plant/area/line/cell
/// hierarchy into a single group-id component (see §4.4's colon-delimited
/// store key convention), which the distilled charset would otherwise reject.
const IDENT: &str = r"[A-Za-z0-9][A-Za-z0-9_.\-:]*";

static PATTERNS: Lazy<[Regex; 9]> = Lazy::new(|| {
    let compile = |body: String| Regex::new(&body).expect("static topic pattern is valid");
    [
        compile(format!(r"^{NAMESPACE}/STATE/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/DBIRTH/({IDENT})/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/DDATA/({IDENT})/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/DDEATH/({IDENT})/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/DCMD/({IDENT})/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/NBIRTH/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/NDATA/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/NDEATH/({IDENT})$")),
        compile(format!(r"^{NAMESPACE}/({IDENT})/NCMD/({IDENT})$")),
    ]
});

/// Returns true if `topic` matches one of the nine allow-listed shapes.
pub fn is_valid_topic(topic: &str) -> bool {
    if topic.is_empty() || topic.len() < NAMESPACE.len() {
        return false;
    }
    PATTERNS.iter().any(|re| re.is_match(topic))
}

impl Topic {
    /// Parses a raw MQTT topic string into a `Topic`.
    pub fn parse(topic: &str) -> Result<Self> {
        if topic.is_empty() {
            return Err(Error::EmptyTopic);
        }
        if !is_valid_topic(topic) {
            return Err(Error::InvalidTopic(topic.to_string()));
        }

        let fields: Vec<&str> = topic.split('/').collect();

        if fields.get(1) == Some(&"STATE") {
            return Ok(Topic {
                command: Command::State,
                group_id: String::new(),
                edge_node_id: String::new(),
                device_id: None,
                has_device: false,
                scada_node_id: Some(fields[2].to_string()),
            });
        }

        if fields.len() < 4 || fields.len() > 5 {
            return Err(Error::InvalidTopic(topic.to_string()));
        }

        let group_id = fields[1].to_string();
        let command = Command::from_str(fields[2])?;
        let edge_node_id = fields[3].to_string();
        let has_device = fields.len() == 5;
        let device_id = fields.get(4).map(|s| s.to_string());

        if has_device != command.has_device() {
            return Err(Error::InvalidTopic(topic.to_string()));
        }

        Ok(Topic {
            command,
            group_id,
            edge_node_id,
            device_id,
            has_device,
            scada_node_id: None,
        })
    }

    /// True for `NBIRTH`/`NDATA`/`DBIRTH`/`DDATA` — delegates to [`Command::carries_metrics`].
    pub fn carries_metrics(&self) -> bool {
        self.command.carries_metrics()
    }

    /// Composes the canonical topic string for this record.
    pub fn to_topic_string(&self) -> String {
        if self.command == Command::State {
            let scada = self.scada_node_id.as_deref().unwrap_or_default();
            return format!("{NAMESPACE}/STATE/{scada}");
        }
        match &self.device_id {
            Some(device) => format!(
                "{NAMESPACE}/{}/{}/{}/{}",
                self.group_id,
                self.command,
                self.edge_node_id,
                device
            ),
            None => format!(
                "{NAMESPACE}/{}/{}/{}",
                self.group_id, self.command, self.edge_node_id
            ),
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_topic_string())
    }
}
