use lazy_static::lazy_static;
use regex::Regex;

/// A recognised text command with its arguments parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Play { position: Option<usize>, query: String },
    List,
    Remove(usize),
    Move { from: usize, to: usize },
    Clear,
    Repeat,
    Stop,
    PauseOrResume,
    Volume(i64),
    Skip,
    Help,
    Cleanup { channel_id: u64, minutes: u64 },
}

/// Result of reading a message that starts with the command prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(BotCommand),
    /// A known command with missing or malformed arguments.
    Usage(&'static CommandHelp),
}

#[derive(Debug, PartialEq, Eq)]
pub struct CommandHelp {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: "play",
        aliases: &["p", "노래"],
        usage: "play [position] <url or search>",
        description: "Queue a track, optionally at a position",
    },
    CommandHelp {
        name: "list",
        aliases: &["queue", "목록"],
        usage: "list",
        description: "Show the current track and the queue",
    },
    CommandHelp {
        name: "remove",
        aliases: &["삭제"],
        usage: "remove <number>",
        description: "Remove a queued track by its number",
    },
    CommandHelp {
        name: "move",
        aliases: &["mv", "이동"],
        usage: "move <from> <to>",
        description: "Move a queued track to another position",
    },
    CommandHelp {
        name: "clear",
        aliases: &["초기화"],
        usage: "clear",
        description: "Empty the queue, keep the current track",
    },
    CommandHelp {
        name: "repeat",
        aliases: &["loop", "반복"],
        usage: "repeat",
        description: "Toggle repeating the current track",
    },
    CommandHelp {
        name: "stop",
        aliases: &["정지"],
        usage: "stop",
        description: "Stop, empty the queue and leave voice",
    },
    CommandHelp {
        name: "pause",
        aliases: &["resume", "일시정지"],
        usage: "pause",
        description: "Pause or resume playback",
    },
    CommandHelp {
        name: "volume",
        aliases: &["vol", "볼륨"],
        usage: "volume <0-100>",
        description: "Set the playback volume",
    },
    CommandHelp {
        name: "skip",
        aliases: &["스킵"],
        usage: "skip",
        description: "Skip the current track",
    },
    CommandHelp {
        name: "help",
        aliases: &["commands", "명령어"],
        usage: "help",
        description: "Show this list",
    },
    CommandHelp {
        name: "cleanup",
        aliases: &["정리주기"],
        usage: "cleanup <#channel> <minutes>",
        description: "Change how often a channel is cleaned (Manage Messages)",
    },
];

fn lookup(name: &str) -> Option<&'static CommandHelp> {
    let name = name.to_lowercase();
    COMMANDS
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name.as_str()))
}

/// Parses `content` if it starts with `prefix` and names a known command.
///
/// Returns `None` for ordinary messages and unknown commands.
pub fn parse(prefix: &str, content: &str) -> Option<Parsed> {
    let body = content.trim().strip_prefix(prefix)?;
    let mut parts = body.splitn(2, char::is_whitespace);
    let help = lookup(parts.next()?)?;
    let args = parts.next().unwrap_or("").trim();

    let usage = Parsed::Usage(help);
    let command = match help.name {
        "play" => match parse_play(args) {
            Some(cmd) => cmd,
            None => return Some(usage),
        },
        "list" => BotCommand::List,
        "remove" => match args.parse() {
            Ok(index) => BotCommand::Remove(index),
            Err(_) => return Some(usage),
        },
        "move" => match parse_move(args) {
            Some(cmd) => cmd,
            None => return Some(usage),
        },
        "clear" => BotCommand::Clear,
        "repeat" => BotCommand::Repeat,
        "stop" => BotCommand::Stop,
        "pause" => BotCommand::PauseOrResume,
        "volume" => match args.parse() {
            Ok(volume) => BotCommand::Volume(volume),
            Err(_) => return Some(usage),
        },
        "skip" => BotCommand::Skip,
        "help" => BotCommand::Help,
        "cleanup" => match parse_cleanup(args) {
            Some(cmd) => cmd,
            None => return Some(usage),
        },
        _ => return None,
    };

    Some(Parsed::Command(command))
}

fn parse_play(args: &str) -> Option<BotCommand> {
    if args.is_empty() {
        return None;
    }

    // A leading all-digit token is a queue position
    if let Some((first, rest)) = args.split_once(char::is_whitespace) {
        if first.chars().all(|c| c.is_ascii_digit()) {
            let rest = rest.trim();
            if rest.is_empty() {
                return None;
            }
            return Some(BotCommand::Play {
                position: first.parse().ok(),
                query: rest.to_string(),
            });
        }
    }

    Some(BotCommand::Play {
        position: None,
        query: args.to_string(),
    })
}

fn parse_move(args: &str) -> Option<BotCommand> {
    let mut parts = args.split_whitespace();
    let from = parts.next()?.parse().ok()?;
    let to = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(BotCommand::Move { from, to })
}

fn parse_cleanup(args: &str) -> Option<BotCommand> {
    let mut parts = args.split_whitespace();
    let channel = parts.next()?;
    let minutes = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    lazy_static! {
        static ref CHANNEL_MENTION: Regex = Regex::new(r"^<#(\d+)>$").unwrap();
    }

    let channel_id = match CHANNEL_MENTION.captures(channel) {
        Some(caps) => caps[1].parse().ok()?,
        None => channel.parse().ok()?,
    };
    if channel_id == 0 {
        return None;
    }

    Some(BotCommand::Cleanup { channel_id, minutes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn command(content: &str) -> BotCommand {
        match parse("!", content) {
            Some(Parsed::Command(cmd)) => cmd,
            other => panic!("expected a command for {content:?}, got {other:?}"),
        }
    }

    fn usage_of(content: &str) -> &'static str {
        match parse("!", content) {
            Some(Parsed::Usage(help)) => help.name,
            other => panic!("expected usage for {content:?}, got {other:?}"),
        }
    }

    #[test]
    fn play_with_and_without_position() {
        assert_eq!(
            command("!play never gonna give you up"),
            BotCommand::Play {
                position: None,
                query: "never gonna give you up".into()
            }
        );
        assert_eq!(
            command("!노래 0 https://youtu.be/abc"),
            BotCommand::Play {
                position: Some(0),
                query: "https://youtu.be/abc".into()
            }
        );
        // A number that is the whole query stays a query
        assert_eq!(
            command("!p 1999"),
            BotCommand::Play {
                position: None,
                query: "1999".into()
            }
        );
    }

    #[test]
    fn aliases_map_to_the_same_command() {
        for content in ["!list", "!queue", "!목록", "!LIST"] {
            assert_eq!(command(content), BotCommand::List);
        }
        assert_eq!(command("!resume"), BotCommand::PauseOrResume);
        assert_eq!(command("!반복"), BotCommand::Repeat);
        assert_eq!(command("!볼륨 30"), BotCommand::Volume(30));
        assert_eq!(command("!mv 3 0"), BotCommand::Move { from: 3, to: 0 });
    }

    #[test]
    fn bad_arguments_produce_usage() {
        assert_eq!(usage_of("!play"), "play");
        assert_eq!(usage_of("!remove"), "remove");
        assert_eq!(usage_of("!remove -1"), "remove");
        assert_eq!(usage_of("!volume loud"), "volume");
        assert_eq!(usage_of("!move 1"), "move");
        assert_eq!(usage_of("!이동 1 2 3"), "move");
        assert_eq!(usage_of("!cleanup #general 10"), "cleanup");
        assert_eq!(usage_of("!cleanup <#123>"), "cleanup");
        assert_eq!(usage_of("!cleanup <#0> 10"), "cleanup");
    }

    #[test]
    fn volume_out_of_range_is_left_to_the_controller() {
        assert_eq!(command("!vol 150"), BotCommand::Volume(150));
        assert_eq!(command("!vol -5"), BotCommand::Volume(-5));
    }

    #[test]
    fn cleanup_accepts_mentions_and_raw_ids() {
        assert_eq!(
            command("!정리주기 <#1391779448839208960> 30"),
            BotCommand::Cleanup {
                channel_id: 1391779448839208960,
                minutes: 30
            }
        );
        assert_eq!(
            command("!cleanup 42 1440"),
            BotCommand::Cleanup {
                channel_id: 42,
                minutes: 1440
            }
        );
    }

    #[test]
    fn malformed_cleanup_channels_show_usage() {
        for content in ["!cleanup <#abc> 30", "!cleanup <#0> 30", "!cleanup #42 30", "!cleanup <#42>x 30"] {
            assert!(
                matches!(parse("!", content), Some(Parsed::Usage(help)) if help.name == "cleanup"),
                "{content}"
            );
        }
    }

    #[test]
    fn ignores_other_messages() {
        assert_eq!(parse("!", "hello there"), None);
        assert_eq!(parse("!", "!dance"), None);
        assert_eq!(parse("!", "!"), None);
        assert_eq!(parse("?", "!skip"), None);
        assert_eq!(parse("?", "?skip"), Some(Parsed::Command(BotCommand::Skip)));
    }

    #[test]
    fn every_command_is_documented_once() {
        let mut names: Vec<&str> = COMMANDS
            .iter()
            .flat_map(|c| std::iter::once(c.name).chain(c.aliases.iter().copied()))
            .collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }
}
