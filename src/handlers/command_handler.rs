use regex::Regex;

use crate::types::CrateRequest;

/// What a chat message asks the bot to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    SendCrates(CrateRequest),
    /// Anything that isn't a command gets the greeting back
    Greet,
}

/// Parses `<trigger> <series> <amount>` chat commands
pub struct CommandInterpreter {
    pattern: Regex,
}

impl CommandInterpreter {
    pub fn new(trigger: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"(?i)^{}\s+([0-9]+)\s+([0-9]+)", regex::escape(trigger)))?;
        Ok(Self { pattern })
    }

    /// Interpret a chat message; trailing text after the amount is ignored
    pub fn interpret(&self, message: &str) -> ChatCommand {
        let request = self.pattern.captures(message).and_then(|caps| {
            crate_request(
                caps.get(1).map(|m| m.as_str()),
                caps.get(2).map(|m| m.as_str()),
            )
        });

        match request {
            Some(request) => ChatCommand::SendCrates(request),
            None => ChatCommand::Greet,
        }
    }
}

/// Build a request from raw tokens.
///
/// No series means no request. A missing or zero amount means one crate, and
/// an amount too large to count is capped, which ends up as "send everything".
pub fn crate_request(series: Option<&str>, quantity: Option<&str>) -> Option<CrateRequest> {
    let series = series.map(str::trim).filter(|s| !s.is_empty())?;

    let quantity = match quantity.map(str::trim).filter(|q| !q.is_empty()) {
        None => 1,
        Some(q) => match q.parse::<u32>() {
            Ok(0) => 1,
            Ok(n) => n,
            Err(_) if q.bytes().all(|b| b.is_ascii_digit()) => u32::MAX,
            Err(_) => 1,
        },
    };

    Some(CrateRequest {
        series: series.to_string(),
        quantity,
    })
}
