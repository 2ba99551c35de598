use std::fmt;

use serde::{Deserialize, Serialize};

/// Speaker category of a single message. Exactly one per message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleTag {
    Guest,
    Agent,
    Bot,
    Template,
}

impl RoleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Agent => "agent",
            Self::Bot => "bot",
            Self::Template => "template",
        }
    }

    /// Parse one of the four wire tokens. Anything else is not a role.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "guest" => Some(Self::Guest),
            "agent" => Some(Self::Agent),
            "bot" => Some(Self::Bot),
            "template" => Some(Self::Template),
            _ => None,
        }
    }
}

impl Default for RoleTag {
    fn default() -> Self {
        Self::Guest
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed transcript message. Immutable once parsed; order of appearance
/// in the source is semantically significant (adjacency drives training-pair
/// extraction and the flow metric).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Position in the source conversation.
    pub index: usize,
    /// Bracket content from the source line, verbatim. Empty for messages
    /// recovered from a batch file, where timestamps are not preserved.
    #[serde(default)]
    pub raw_timestamp: String,
    /// Lowercased, trimmed sender prefix if the line had a `Name:` prefix.
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub role: RoleTag,
    /// Full post-timestamp line content, sender prefix included.
    pub text: String,
    /// Message text with any sender prefix removed.
    pub body: String,
}

impl Message {
    /// Body with a redundant leading `"<role>: "` prefix stripped, trimmed.
    ///
    /// Messages recovered from batch files carry the serialized role token
    /// inside their text; exports must not leak it into training data.
    pub fn clean_body(&self) -> String {
        let content = if self.body.is_empty() {
            self.text.as_str()
        } else {
            self.body.as_str()
        };

        if let Some((prefix, rest)) = content.split_once(':') {
            if RoleTag::parse(prefix.trim().to_lowercase().as_str()).is_some() {
                return rest.trim().to_string();
            }
        }
        content.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str, body: &str) -> Message {
        Message {
            index: 0,
            raw_timestamp: String::new(),
            sender_name: None,
            role: RoleTag::Guest,
            text: text.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn role_tokens_round_trip() {
        for role in [RoleTag::Guest, RoleTag::Agent, RoleTag::Bot, RoleTag::Template] {
            assert_eq!(RoleTag::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_token_rejected() {
        assert_eq!(RoleTag::parse("system"), None);
        assert_eq!(RoleTag::parse("Agent"), None, "tokens are exact, not case-folded");
    }

    #[test]
    fn default_role_is_guest() {
        assert_eq!(RoleTag::default(), RoleTag::Guest);
    }

    #[test]
    fn clean_body_strips_role_prefix() {
        let msg = message("guest: hello there", "guest: hello there");
        assert_eq!(msg.clean_body(), "hello there");
    }

    #[test]
    fn clean_body_keeps_non_role_prefix() {
        let msg = message("John: hello there", "hello there");
        assert_eq!(msg.clean_body(), "hello there");

        let msg = message("Note: remember this", "Note: remember this");
        assert_eq!(msg.clean_body(), "Note: remember this");
    }

    #[test]
    fn clean_body_falls_back_to_text() {
        let msg = message("agent: yes we can", "");
        assert_eq!(msg.clean_body(), "yes we can");
    }
}
