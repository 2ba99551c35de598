//! Role classification.
//!
//! Pure and deterministic: the role is a function of the lowercased message
//! text and the optional lowercased sender name, nothing else. Precedence is
//! fixed (bot indicators beat template indicators beat agent-name matches)
//! and the first match wins. All matching is substring-based; this is a
//! lexical pass, not NLP.

use crate::lexicon::Lexicons;
use crate::models::{Message, RoleTag};

/// Classifies messages against an injected, immutable lexicon table.
pub struct RoleClassifier<'a> {
    lexicons: &'a Lexicons,
}

impl<'a> RoleClassifier<'a> {
    pub fn new(lexicons: &'a Lexicons) -> Self {
        Self { lexicons }
    }

    /// Classify one message by its full text and optional sender name.
    ///
    /// Precedence, first match wins:
    /// 1. bot indicator anywhere in the text
    /// 2. template indicator anywhere in the text
    /// 3. known agent alias as a substring of the sender name
    /// 4. known agent alias anywhere in the text (covers transcripts where
    ///    the agent signs inside the message instead of as a prefix)
    /// 5. guest
    pub fn classify(&self, text: &str, sender_name: Option<&str>) -> RoleTag {
        let text_lower = text.to_lowercase();

        if contains_any(&text_lower, &self.lexicons.bot_indicators) {
            return RoleTag::Bot;
        }

        if contains_any(&text_lower, &self.lexicons.template_indicators) {
            return RoleTag::Template;
        }

        if let Some(sender) = sender_name {
            let sender_lower = sender.to_lowercase();
            if contains_any(&sender_lower, &self.lexicons.agent_names) {
                return RoleTag::Agent;
            }
        }

        if contains_any(&text_lower, &self.lexicons.agent_names) {
            return RoleTag::Agent;
        }

        RoleTag::Guest
    }

    /// Assign roles across a parsed conversation in place.
    pub fn classify_messages(&self, messages: &mut [Message]) {
        for msg in messages.iter_mut() {
            msg.role = self.classify(&msg.text, msg.sender_name.as_deref());
        }
    }
}

fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle.as_str()))
}
