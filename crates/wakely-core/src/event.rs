// ── Inbound events ──
//
// Closed tagged types produced by parsing at the gateway boundary.
// The engine consumes these exhaustively; raw command strings and
// callback payloads never reach it.

use std::fmt;

/// Chat/operator session identifier (one per chat).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message previously sent through the gateway, used
/// to retract transient inline-button prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageId(pub i32);

/// The registered bot command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Wol,
    Add,
    Modify,
    Delete,
    List,
    Help,
    Cancel,
}

impl Command {
    /// Parse a slash command (`/wol`, `/wol@SomeBot`, ...).
    pub fn parse(text: &str) -> Option<Self> {
        let body = text.strip_prefix('/')?;
        let name = body.split(['@', ' ']).next().unwrap_or(body);
        match name {
            "wol" => Some(Self::Wol),
            "add" => Some(Self::Add),
            "modify" => Some(Self::Modify),
            "delete" => Some(Self::Delete),
            "list" => Some(Self::List),
            "help" => Some(Self::Help),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// A button-driven selection event. Wire form is `tag` or `tag:name`.
///
/// Name-carrying variants are pre-validated against the registry
/// snapshot at prompt time, which may be stale by the time the operator
/// taps the button — the engine re-validates at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Show the wake menu.
    WakeMenu,
    /// Wake the named device.
    Wake(String),
    /// Begin the interactive add flow.
    StartAdd,
    /// Show the device picker for modification.
    ModifyMenu,
    /// Show the field picker for the named device.
    ModifyDevice(String),
    /// Begin the rename flow for the named device.
    ModifyName(String),
    /// Begin the MAC-change flow for the named device.
    ModifyMac(String),
    /// Show the device picker for deletion.
    DeleteMenu,
    /// Delete the named device.
    Delete(String),
    /// Abort whatever is pending.
    Cancel,
}

impl Selection {
    pub fn parse(data: &str) -> Option<Self> {
        let (tag, name) = match data.split_once(':') {
            Some((tag, name)) => (tag, Some(name)),
            None => (data, None),
        };
        match (tag, name) {
            ("wol", None) => Some(Self::WakeMenu),
            ("wol", Some(name)) => Some(Self::Wake(name.to_owned())),
            ("add", None) => Some(Self::StartAdd),
            ("modify", None) => Some(Self::ModifyMenu),
            ("modify", Some(name)) => Some(Self::ModifyDevice(name.to_owned())),
            ("modify_name", Some(name)) => Some(Self::ModifyName(name.to_owned())),
            ("modify_mac", Some(name)) => Some(Self::ModifyMac(name.to_owned())),
            ("delete", None) => Some(Self::DeleteMenu),
            ("delete", Some(name)) => Some(Self::Delete(name.to_owned())),
            ("cancel", None) => Some(Self::Cancel),
            _ => None,
        }
    }

    /// Wire form used as callback payload when building keyboards.
    pub fn encode(&self) -> String {
        match self {
            Self::WakeMenu => "wol".into(),
            Self::Wake(name) => format!("wol:{name}"),
            Self::StartAdd => "add".into(),
            Self::ModifyMenu => "modify".into(),
            Self::ModifyDevice(name) => format!("modify:{name}"),
            Self::ModifyName(name) => format!("modify_name:{name}"),
            Self::ModifyMac(name) => format!("modify_mac:{name}"),
            Self::DeleteMenu => "delete".into(),
            Self::Delete(name) => format!("delete:{name}"),
            Self::Cancel => "cancel".into(),
        }
    }
}

/// One inbound event from the messaging gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub session: SessionId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A registered slash command.
    Command(Command),
    /// Free text: device name, comma-joined quick command, or a
    /// response to an in-progress flow.
    Text(String),
    /// An inline-button selection.
    Selection(Selection),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_parse_variants() {
        assert_eq!(Command::parse("/wol"), Some(Command::Wol));
        assert_eq!(Command::parse("/list@WakelyBot"), Some(Command::List));
        assert_eq!(Command::parse("/help extra"), Some(Command::Help));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("wol"), None);
    }

    #[test]
    fn selection_round_trip() {
        let cases = [
            Selection::WakeMenu,
            Selection::Wake("desk".into()),
            Selection::StartAdd,
            Selection::ModifyMenu,
            Selection::ModifyDevice("desk".into()),
            Selection::ModifyName("desk".into()),
            Selection::ModifyMac("desk".into()),
            Selection::DeleteMenu,
            Selection::Delete("desk".into()),
            Selection::Cancel,
        ];
        for sel in cases {
            assert_eq!(Selection::parse(&sel.encode()), Some(sel));
        }
    }

    #[test]
    fn selection_rejects_unknown_tags() {
        assert_eq!(Selection::parse("reboot:desk"), None);
        assert_eq!(Selection::parse("modify_name"), None);
        assert_eq!(Selection::parse(""), None);
    }
}
