use thiserror::Error;

pub const JOIN_COMMAND: &str = "/join";

/// A classified inbound line. The username line is not represented here: the
/// session handler consumes the connection's first line before any
/// classification happens.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// `/join <room>` with the room argument.
    Join(String),
    /// Anything else: a chat message to relay.
    Chat(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("usage: /join <room>")]
    MissingRoom,
}

/// Classifies one trimmed, non-empty line.
pub fn classify(line: &str) -> Result<Inbound, ParseError> {
    if let Some(rest) = line.strip_prefix(JOIN_COMMAND) {
        // The token must stand alone: "/joinAITU" carries no
        // space-separated room argument.
        let room = match rest.chars().next() {
            Some(c) if c.is_whitespace() => rest.trim(),
            _ => "",
        };
        if room.is_empty() {
            return Err(ParseError::MissingRoom);
        }
        return Ok(Inbound::Join(room.to_string()));
    }

    Ok(Inbound::Chat(line.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_with_argument() {
        assert_eq!(classify("/join AITU"), Ok(Inbound::Join("AITU".to_string())));
        assert_eq!(classify("/join   NU"), Ok(Inbound::Join("NU".to_string())));
    }

    #[test]
    fn bare_join_is_rejected() {
        assert_eq!(classify("/join"), Err(ParseError::MissingRoom));
        assert_eq!(classify("/join   "), Err(ParseError::MissingRoom));
    }

    #[test]
    fn glued_join_token_has_no_room_argument() {
        assert_eq!(classify("/joinAITU"), Err(ParseError::MissingRoom));
        assert_eq!(classify("/joined late"), Err(ParseError::MissingRoom));
    }

    #[test]
    fn everything_else_is_chat() {
        assert_eq!(classify("hello"), Ok(Inbound::Chat("hello".to_string())));
        assert_eq!(
            classify("join me later"),
            Ok(Inbound::Chat("join me later".to_string()))
        );
    }
}
