//! Actions a fleet can be asked to perform.

use am43_protocol::Command;
use serde::{Deserialize, Serialize};

/// Requested fleet action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlindsAction {
    /// Move fully open.
    Open,
    /// Move fully closed.
    Close,
    /// Stop motion.
    Stop,
    /// Report readings without moving.
    #[default]
    Status,
}

impl BlindsAction {
    /// All actions, in display order.
    pub const ALL: [BlindsAction; 4] = [
        BlindsAction::Open,
        BlindsAction::Close,
        BlindsAction::Stop,
        BlindsAction::Status,
    ];

    /// Map a trigger name to an action.
    ///
    /// Matching is case-insensitive. Anything that is not one of the four
    /// action names falls back to [`BlindsAction::Status`].
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(BlindsAction::Status)
    }

    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlindsAction::Open => "Open",
            BlindsAction::Close => "Close",
            BlindsAction::Stop => "Stop",
            BlindsAction::Status => "Status",
        }
    }

    /// The motion command for this action, if it moves the blind.
    pub fn motion_command(&self) -> Option<Command> {
        match self {
            BlindsAction::Open => Some(Command::open()),
            BlindsAction::Close => Some(Command::close()),
            BlindsAction::Stop => Some(Command::stop()),
            BlindsAction::Status => None,
        }
    }
}

impl std::str::FromStr for BlindsAction {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for BlindsAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_names() {
        assert_eq!(BlindsAction::parse("Open"), BlindsAction::Open);
        assert_eq!(BlindsAction::parse("close"), BlindsAction::Close);
        assert_eq!(BlindsAction::parse("STOP"), BlindsAction::Stop);
        assert_eq!(BlindsAction::parse("Status"), BlindsAction::Status);
    }

    #[test]
    fn test_unknown_names_fall_back_to_status() {
        assert_eq!(BlindsAction::parse("favicon.ico"), BlindsAction::Status);
        assert_eq!(BlindsAction::parse(""), BlindsAction::Status);
        assert_eq!("Halfway".parse::<BlindsAction>(), Ok(BlindsAction::Status));
    }

    #[test]
    fn test_motion_commands() {
        assert_eq!(BlindsAction::Open.motion_command(), Some(Command::MoveAuto { percent: 0 }));
        assert_eq!(
            BlindsAction::Close.motion_command(),
            Some(Command::MoveAuto { percent: 100 })
        );
        assert_eq!(BlindsAction::Stop.motion_command(), Some(Command::stop()));
        assert_eq!(BlindsAction::Status.motion_command(), None);
    }
}
