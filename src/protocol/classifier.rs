use log::debug;
use regex::Regex;

use super::message::{ConsoleMessage, MessageClass, PlayerEvent, PlayerInfo};

/// Marker prefix of the enhanced player-list dump line
pub const PLAYER_INFO_MARKER: &str = "telnetclient:playerinfo:";

/// Result of classifying one raw line
#[derive(Debug, Clone)]
pub struct Classified {
    /// The console message to display
    pub message: ConsoleMessage,

    /// Effect on the player list, if any
    pub event: PlayerEvent,
}

/// How a rule decides whether it applies
#[derive(Debug, Clone)]
enum Matcher {
    /// Regex applied to the raw line
    Line(Regex),

    /// Regex applied to the payload (leading log headers stripped)
    Payload(Regex),

    /// Substring match anywhere in the raw line
    Contains(String),

    /// Prefix match on the payload
    Prefix(String),
}

/// What a matching rule extracts from the line
#[derive(Debug, Clone, Copy)]
enum Action {
    None,
    Join,
    Leave,
    Chat,
    Snapshot,
}

/// One entry of the ordered classification table
#[derive(Debug, Clone)]
pub struct Rule {
    class: MessageClass,
    matcher: Matcher,
    action: Action,
}

impl Rule {
    /// Rule matching a substring anywhere in the raw line
    pub fn contains(needle: impl Into<String>, class: MessageClass) -> Self {
        Self {
            class,
            matcher: Matcher::Contains(needle.into()),
            action: Action::None,
        }
    }

    /// Rule matching a payload prefix
    pub fn prefix(prefix: impl Into<String>, class: MessageClass) -> Self {
        Self {
            class,
            matcher: Matcher::Prefix(prefix.into()),
            action: Action::None,
        }
    }

    /// Rule matching a regex against the raw line
    pub fn line_regex(pattern: &str, class: MessageClass) -> Result<Self, regex::Error> {
        Ok(Self {
            class,
            matcher: Matcher::Line(Regex::new(pattern)?),
            action: Action::None,
        })
    }

    /// Rule matching a regex against the payload, after log headers
    pub fn payload_regex(pattern: &str, class: MessageClass) -> Result<Self, regex::Error> {
        Ok(Self {
            class,
            matcher: Matcher::Payload(Regex::new(pattern)?),
            action: Action::None,
        })
    }

    fn with_action(mut self, action: Action) -> Self {
        self.action = action;
        self
    }

    fn try_match(&self, raw: &str, payload: &str) -> Option<Classified> {
        let message = || ConsoleMessage::new(self.class, raw);

        match &self.matcher {
            Matcher::Contains(needle) => raw.contains(needle.as_str()).then(|| Classified {
                message: message(),
                event: PlayerEvent::Other,
            }),
            Matcher::Prefix(prefix) => {
                if !payload.starts_with(prefix.as_str()) {
                    return None;
                }
                let event = match self.action {
                    Action::Snapshot => parse_player_dump(&payload[prefix.len()..]),
                    _ => PlayerEvent::Other,
                };
                Some(Classified {
                    message: message(),
                    event,
                })
            }
            Matcher::Line(re) => re.is_match(raw).then(|| Classified {
                message: message(),
                event: PlayerEvent::Other,
            }),
            Matcher::Payload(re) => {
                let caps = re.captures(payload)?;
                let event = match self.action {
                    Action::Join => {
                        let name = caps.name("name")?.as_str();
                        let ip = caps.name("ip").map(|m| m.as_str()).unwrap_or_default();
                        PlayerEvent::Joined(PlayerInfo::joined(name, ip))
                    }
                    Action::Leave => PlayerEvent::Left {
                        name: caps.name("name")?.as_str().to_string(),
                    },
                    Action::Chat => PlayerEvent::Chat {
                        name: caps.name("name")?.as_str().to_string(),
                        message: caps.name("msg").map(|m| m.as_str()).unwrap_or_default().to_string(),
                    },
                    Action::None | Action::Snapshot => PlayerEvent::Other,
                };
                Some(Classified {
                    message: message(),
                    event,
                })
            }
        }
    }
}

/// Parse the JSON body of an enhanced player-list dump.
///
/// Unparseable payloads classify as plain text rather than failing.
fn parse_player_dump(body: &str) -> PlayerEvent {
    match serde_json::from_str::<Vec<PlayerInfo>>(body.trim()) {
        Ok(players) => PlayerEvent::Snapshot(players),
        Err(e) => {
            debug!("unparseable player list payload: {}", e);
            PlayerEvent::Other
        }
    }
}

/// Ordered line classifier; first matching rule wins.
///
/// The default table covers the stock server dialect. Dialect-specific
/// lines can be handled by prepending rules via [`Classifier::with_rules`]
/// or appending them via [`Classifier::push_rule`].
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    header: Regex,
}

impl Classifier {
    /// Create a classifier with an explicit rule table
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            header: log_header_pattern(),
        }
    }

    /// Append a rule; earlier rules take precedence
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Classify one raw line.
    ///
    /// Never fails: lines matching no rule come back as plain text with
    /// [`MessageClass::Normal`] and no player event.
    pub fn classify(&self, raw_line: &str) -> Classified {
        let raw = raw_line.trim_end_matches(['\r', '\n']);
        let payload = self.strip_log_header(raw);

        for rule in &self.rules {
            if let Some(hit) = rule.try_match(raw, payload) {
                return hit;
            }
        }

        Classified {
            message: ConsoleMessage::new(MessageClass::Normal, raw),
            event: PlayerEvent::Other,
        }
    }

    /// Strip leading `[..]` log headers, e.g. `:[12:34:56 INFO]:` or
    /// `[12:34:56] [Server thread/INFO]:`
    fn strip_log_header<'a>(&self, raw: &'a str) -> &'a str {
        match self.header.find(raw) {
            Some(m) => &raw[m.end()..],
            None => raw,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let rules = vec![
            Rule::prefix(PLAYER_INFO_MARKER, MessageClass::Info).with_action(Action::Snapshot),
            Rule::payload_regex(
                r"^(?:Player\s+)?(?P<name>\w+)\[/(?P<ip>[0-9A-Fa-f.:]+):\d+\] logged in",
                MessageClass::Info,
            )
            .expect("join pattern")
            .with_action(Action::Join),
            Rule::payload_regex(
                r"^(?P<name>\w+) (?:left the game|lost connection)",
                MessageClass::Info,
            )
            .expect("leave pattern")
            .with_action(Action::Leave),
            Rule::payload_regex(r"^<(?P<name>\w+)>\s?(?P<msg>.*)$", MessageClass::Chat)
                .expect("chat pattern")
                .with_action(Action::Chat),
            Rule::contains("[PLAYER_COMMAND]", MessageClass::PlayerCommand),
            Rule::contains("issued server command", MessageClass::ServerCommand),
            Rule::line_regex(
                r"\[[^\[\]]*\b(SEVERE|ERROR|WARN|WARNING)\b[^\[\]]*\]",
                MessageClass::Error,
            )
            .expect("level pattern"),
            Rule::line_regex(r"\[[^\[\]]*\bINFO\b[^\[\]]*\]", MessageClass::Info)
                .expect("level pattern"),
        ];
        Self::with_rules(rules)
    }
}

fn log_header_pattern() -> Regex {
    Regex::new(r"^:?(?:\[[^\[\]]*\]:?\s*){1,2}").expect("header pattern")
}
