use std::str::FromStr;

use glam::Vec3;
use shoal_common::EntityIdentity;
use shoal_kernel::{GameState, KernelError};

/// A request arriving on the out-of-band command channel.
///
/// Commands are only ever executed on the authoritative node; their effects
/// reach other nodes through replication.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `create <name>`: a player joined.
    Create { name: String },
    /// `destroy <id>`: a player left.
    Destroy { id: EntityIdentity },
    /// `turn <id> <radians-per-second>`
    Turn { id: EntityIdentity, turn_speed: f32 },
    /// `enable <id>`
    Enable(EntityIdentity),
    /// `disable <id>`
    Disable(EntityIdentity),
    /// `spawn <x> <y> <z>`: drop a collectible.
    Spawn(Vec3),
    /// `collect <slot>`
    Collect(usize),
    /// `rotate <radians>`: turn every player at once.
    Rotate(f32),
}

/// What executing a command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Created(EntityIdentity),
    Spawned(usize),
    Done,
}

/// Errors from parsing command text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    UnknownVerb(String),
    #[error("{verb}: missing {argument}")]
    MissingArgument {
        verb: &'static str,
        argument: &'static str,
    },
    #[error("{verb}: invalid {argument} {value:?}")]
    InvalidArgument {
        verb: &'static str,
        argument: &'static str,
        value: String,
    },
    #[error("{verb}: unexpected trailing input {rest:?}")]
    Trailing { verb: &'static str, rest: String },
}

impl Command {
    /// Execute against the authoritative node's state.
    pub fn apply(&self, state: &mut GameState) -> Result<CommandOutcome, KernelError> {
        let outcome = match self {
            Self::Create { name } => CommandOutcome::Created(state.create_interactive_entity(name)?),
            Self::Destroy { id } => {
                state.destroy_interactive_entity(*id)?;
                CommandOutcome::Done
            }
            Self::Turn { id, turn_speed } => {
                state.set_turn_speed(*id, *turn_speed)?;
                CommandOutcome::Done
            }
            Self::Enable(id) => {
                state.set_enabled(*id, true)?;
                CommandOutcome::Done
            }
            Self::Disable(id) => {
                state.set_enabled(*id, false)?;
                CommandOutcome::Done
            }
            Self::Spawn(position) => CommandOutcome::Spawned(state.spawn_collectible(*position)?),
            Self::Collect(slot) => {
                state.collect(*slot)?;
                CommandOutcome::Done
            }
            Self::Rotate(delta) => {
                state.rotate_all(*delta);
                CommandOutcome::Done
            }
        };
        tracing::debug!(command = ?self, ?outcome, "command applied");
        Ok(outcome)
    }
}

struct Args<'a> {
    verb: &'static str,
    rest: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next(&mut self, argument: &'static str) -> Result<&'a str, CommandError> {
        self.rest.next().ok_or(CommandError::MissingArgument {
            verb: self.verb,
            argument,
        })
    }

    fn parse<T: FromStr>(&mut self, argument: &'static str) -> Result<T, CommandError> {
        let raw = self.next(argument)?;
        raw.parse().map_err(|_| CommandError::InvalidArgument {
            verb: self.verb,
            argument,
            value: raw.to_string(),
        })
    }

    fn id(&mut self) -> Result<EntityIdentity, CommandError> {
        self.parse("id").map(EntityIdentity)
    }

    fn finish(mut self) -> Result<(), CommandError> {
        let rest: Vec<&str> = self.rest.by_ref().collect();
        if rest.is_empty() {
            Ok(())
        } else {
            Err(CommandError::Trailing {
                verb: self.verb,
                rest: rest.join(" "),
            })
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandError::Empty)?;
        let verb: &'static str = match verb {
            "create" => "create",
            "destroy" => "destroy",
            "turn" => "turn",
            "enable" => "enable",
            "disable" => "disable",
            "spawn" => "spawn",
            "collect" => "collect",
            "rotate" => "rotate",
            other => return Err(CommandError::UnknownVerb(other.to_string())),
        };
        let mut args = Args { verb, rest: words };

        let command = match verb {
            "create" => {
                // Names may contain spaces; take the rest of the line.
                let name: Vec<&str> = args.rest.by_ref().collect();
                if name.is_empty() {
                    return Err(CommandError::MissingArgument {
                        verb,
                        argument: "name",
                    });
                }
                Self::Create {
                    name: name.join(" "),
                }
            }
            "destroy" => Self::Destroy { id: args.id()? },
            "turn" => Self::Turn {
                id: args.id()?,
                turn_speed: args.parse("turn speed")?,
            },
            "enable" => Self::Enable(args.id()?),
            "disable" => Self::Disable(args.id()?),
            "spawn" => Self::Spawn(Vec3::new(
                args.parse("x")?,
                args.parse("y")?,
                args.parse("z")?,
            )),
            "collect" => Self::Collect(args.parse("slot")?),
            _ => Self::Rotate(args.parse("angle")?),
        };
        args.finish()?;
        Ok(command)
    }
}

/// Parse a script: one command per line, blank lines and `#` comments skipped.
/// Errors carry the 1-based line number.
pub fn parse_script(text: &str) -> Result<Vec<Command>, (usize, CommandError)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(n, line)| line.parse::<Command>().map_err(|e| (n, e)))
        .collect()
}
