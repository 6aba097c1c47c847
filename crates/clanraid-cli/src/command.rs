//! Parsing of console command lines.
//!
//! ```text
//! damage <amount> [@member]   record a hit
//! defeat [@member]            record a finishing hit
//! undo                        undo your last record
//! apply / release             take or release the attack turn
//! sub <boss|0> / unsub <boss|0>
//! modify <cycle> <boss> <health>
//! subs                        list subscriptions
//! remind <id>... / drop <id>...
//! status / help / quit
//! ```

use clanraid_types::{BossTarget, MemberId};

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Damage {
        amount: u64,
        behalf: Option<MemberId>,
    },
    Defeat {
        behalf: Option<MemberId>,
    },
    Undo,
    Apply,
    Release,
    Subscribe(BossTarget),
    Unsubscribe(BossTarget),
    Modify {
        cycle: u32,
        boss_num: u32,
        health: u64,
    },
    Subscribers,
    Remind(Vec<MemberId>),
    DropMembers(Vec<MemberId>),
    Status,
    Help,
    Quit,
}

/// Why a line could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`, type `help` for a list")]
    Unknown(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("`{0}` is not a valid number")]
    InvalidNumber(String),

    #[error("unexpected argument `{0}`")]
    Unexpected(String),
}

pub const HELP: &str = "\
commands:
  damage <amount> [@member]       record a hit (optionally for someone else)
  defeat [@member]                record a finishing hit
  undo                            undo your last record
  apply                           apply for the attack turn
  release                         release the attack turn
  sub <boss|0>                    subscribe (0 = current boss)
  unsub <boss|0>                  drop a subscription
  modify <cycle> <boss> <health>  admin: override boss state
  subs                            list subscriptions
  remind <id>...                  admin: remind members
  drop <id>...                    admin: remove members
  status                          show the boss
  quit                            leave";

/// Parse one input line.
pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(CommandError::Empty);
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "damage" | "d" => Command::Damage {
            amount: number(words.next(), "amount")?,
            behalf: behalf(words.next())?,
        },
        "defeat" | "kill" => Command::Defeat {
            behalf: behalf(words.next())?,
        },
        "undo" => Command::Undo,
        "apply" => Command::Apply,
        "release" | "cancel" => Command::Release,
        "sub" => Command::Subscribe(BossTarget::from_num(number(words.next(), "boss")?)),
        "unsub" => Command::Unsubscribe(BossTarget::from_num(number(words.next(), "boss")?)),
        "modify" => Command::Modify {
            cycle: number(words.next(), "cycle")?,
            boss_num: number(words.next(), "boss")?,
            health: number(words.next(), "health")?,
        },
        "subs" => Command::Subscribers,
        "remind" => Command::Remind(members(&mut words)?),
        "drop" => Command::DropMembers(members(&mut words)?),
        "status" | "s" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };

    match words.next() {
        Some(extra) => Err(CommandError::Unexpected(extra.to_owned())),
        None => Ok(command),
    }
}

fn number<N: core::str::FromStr>(word: Option<&str>, name: &'static str) -> Result<N, CommandError> {
    let word = word.ok_or(CommandError::MissingArgument(name))?;
    word.parse()
        .map_err(|_err| CommandError::InvalidNumber(word.to_owned()))
}

fn behalf(word: Option<&str>) -> Result<Option<MemberId>, CommandError> {
    match word {
        None => Ok(None),
        Some(word) => match word.strip_prefix('@') {
            Some(id) => number(Some(id), "member").map(|id| Some(MemberId(id))),
            None => Err(CommandError::Unexpected(word.to_owned())),
        },
    }
}

fn members<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<Vec<MemberId>, CommandError> {
    let ids = words
        .map(|word| number(Some(word.trim_start_matches('@')), "member").map(MemberId))
        .collect::<Result<Vec<_>, _>>()?;
    if ids.is_empty() {
        return Err(CommandError::MissingArgument("member"));
    }
    Ok(ids)
}
