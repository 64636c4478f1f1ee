//! Rule-based replies used when the inference endpoint is unreachable.

use regex::Regex;

/// Reply to prompts about movies.
pub const MOVIE_REPLY: &str = "My favorite movie is The Godfather Part II. What's yours?";

/// Reply to greetings.
pub const GREETING_REPLY: &str = "Heyyy! How can I help you today?";

/// A pattern mapped to a canned reply.
struct ReplyRule {
    pattern: Regex,
    reply: &'static str,
}

/// Deterministic responder: ordered rules, first match wins, echo otherwise.
pub struct FallbackResponder {
    rules: Vec<ReplyRule>,
}

impl FallbackResponder {
    /// Compile the rule set.
    ///
    /// # Errors
    /// Returns an error if any regex pattern is invalid.
    pub fn new() -> Result<Self, regex::Error> {
        let rules = vec![
            ReplyRule {
                pattern: Regex::new(r"(?i)movie|film")?,
                reply: MOVIE_REPLY,
            },
            // Substring match, so "hi" also fires inside longer words.
            ReplyRule {
                pattern: Regex::new(r"(?i)hello|hi|salut|hola|holà|halo")?,
                reply: GREETING_REPLY,
            },
        ];
        Ok(Self { rules })
    }

    /// Produce a reply for `input`. Never fails.
    #[must_use]
    pub fn respond(&self, input: &str) -> String {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(input))
            .map_or_else(|| echo_reply(input), |rule| rule.reply.to_string())
    }
}

fn echo_reply(input: &str) -> String {
    format!("You said: \"{input}\". I’m a placeholder bot for now 🤖")
}
