//! Channel names are `.`-separated tokens. Subscriptions may use `*` to match exactly one
//! token and a trailing `>` to match one or more remaining tokens.

use crate::connection::Error;

/// Checks a channel that will be published to. Wildcards are not allowed.
pub fn validate_channel(channel: &str) -> Result<(), Error> {
    validate(channel, false)
}

/// Checks a channel pattern that will be subscribed to.
pub fn validate_pattern(pattern: &str) -> Result<(), Error> {
    validate(pattern, true)
}

fn validate(subject: &str, allow_wildcards: bool) -> Result<(), Error> {
    let tokens: Vec<&str> = subject.split('.').collect();

    for (index, token) in tokens.iter().enumerate() {
        let valid = match *token {
            "" => false,
            "*" => allow_wildcards,
            ">" => allow_wildcards && index == tokens.len() - 1,
            other => !other.contains(['*', '>']) && !other.contains(char::is_whitespace),
        };

        if !valid {
            return Err(Error::InvalidChannel(subject.to_string()));
        }
    }

    Ok(())
}

/// Whether a published channel is matched by a subscription pattern.
pub fn matches(pattern: &str, channel: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut channel_tokens = channel.split('.');

    loop {
        match (pattern_tokens.next(), channel_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => {}
            (Some(p), Some(c)) if p == c => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
