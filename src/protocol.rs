//! Wire vocabulary shared by every role.
//!
//! Every message is one line of text.  This module owns:
//! - the payload validator applied to every id and info field,
//! - the port parser used for both CLI arguments and protocol fields,
//! - parsing a received line into a registry or station request,
//! - formatting the requests a client sends.
//!
//! No I/O happens here.
//!
//! # Messages
//!
//! ```text
//!  client → registry   !<id>:<port>   add mapping, never answered
//!  client → registry   ?<id>          query, answered <port> or ;
//!  client → registry   @              dump, answered id:port lines or nothing
//!  client → station    log            answered visitor lines (if any) then .
//!  client → station    <visitor id>   answered with the station's info
//! ```

/// Characters that may never appear in an id or info payload.
pub const FORBIDDEN_CHARS: [char; 3] = ['\n', '\r', ':'];

/// First character of a registry add request.
pub const ADD_PREFIX: char = '!';
/// First character of a registry query request.
pub const QUERY_PREFIX: char = '?';
/// First character of a registry dump request.
pub const DUMP_PREFIX: char = '@';
/// Separator between id and port in an add request and in dump output.
pub const MAPPING_SEPARATOR: char = ':';

/// Registry reply to a query for an unknown id.
pub const NO_ENTRY: &str = ";";
/// Station request for its visitor log.
pub const LOG_COMMAND: &str = "log";
/// Final line of every station log reply.
pub const END_OF_LOG: &str = ".";

/// Returns true if `payload` contains none of [`FORBIDDEN_CHARS`].
pub fn is_valid_payload(payload: &str) -> bool {
    !payload.contains(&FORBIDDEN_CHARS[..])
}

/// Parse a base-10 port in `1..=65535`.
///
/// Only ASCII digits are accepted; signs, whitespace and the empty string are
/// rejected.
pub fn parse_port(text: &str) -> Option<u16> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match text.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// A line received by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryRequest<'a> {
    Add { id: &'a str, port: u16 },
    Query { id: &'a str },
    Dump,
}

impl<'a> RegistryRequest<'a> {
    /// Parse one line.  Returns `None` for anything the registry ignores.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut chars = line.chars();
        match chars.next()? {
            ADD_PREFIX => parse_add(chars.as_str()),
            QUERY_PREFIX => {
                let id = chars.as_str();
                is_valid_payload(id).then_some(Self::Query { id })
            }
            DUMP_PREFIX => Some(Self::Dump),
            _ => None,
        }
    }
}

/// `<id>:<port>` with exactly one separator, a non-empty id and a valid port.
fn parse_add(body: &str) -> Option<RegistryRequest<'_>> {
    if body.matches(MAPPING_SEPARATOR).count() > 1 {
        return None;
    }
    let (id, port) = body.split_once(MAPPING_SEPARATOR)?;
    if id.is_empty() || !is_valid_payload(id) {
        return None;
    }
    let port = parse_port(port)?;
    Some(RegistryRequest::Add { id, port })
}

/// A line received by a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationRequest<'a> {
    Log,
    Visit { visitor: &'a str },
}

impl<'a> StationRequest<'a> {
    /// Parse one line.  Returns `None` for lines carrying a forbidden
    /// character; every other line is either `log` or a visit.
    pub fn parse(line: &'a str) -> Option<Self> {
        if !is_valid_payload(line) {
            return None;
        }
        if line == LOG_COMMAND {
            Some(Self::Log)
        } else {
            Some(Self::Visit { visitor: line })
        }
    }
}

/// `!<id>:<port>`
pub fn add_request(id: &str, port: u16) -> String {
    format!("{ADD_PREFIX}{id}{MAPPING_SEPARATOR}{port}")
}

/// `?<id>`
pub fn query_request(id: &str) -> String {
    format!("{QUERY_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_validator_rejects_each_forbidden_char() {
        assert!(is_valid_payload("plain id"));
        assert!(is_valid_payload(""));
        assert!(!is_valid_payload("a:b"));
        assert!(!is_valid_payload("a\nb"));
        assert!(!is_valid_payload("a\rb"));
    }

    #[test]
    fn port_bounds() {
        assert_eq!(parse_port("1"), Some(1));
        assert_eq!(parse_port("65535"), Some(65535));
        assert_eq!(parse_port("0"), None);
        assert_eq!(parse_port("65536"), None);
        assert_eq!(parse_port("99999999999999999999"), None);
    }

    #[test]
    fn port_rejects_non_digits() {
        assert_eq!(parse_port(""), None);
        assert_eq!(parse_port("+80"), None);
        assert_eq!(parse_port(" 80"), None);
        assert_eq!(parse_port("80a"), None);
        assert_eq!(parse_port("-1"), None);
    }

    #[test]
    fn leading_zeros_are_digits() {
        assert_eq!(parse_port("0080"), Some(80));
    }

    #[test]
    fn parses_add() {
        assert_eq!(
            RegistryRequest::parse("!alpha:8080"),
            Some(RegistryRequest::Add {
                id: "alpha",
                port: 8080
            })
        );
    }

    #[test]
    fn add_with_two_colons_is_ignored() {
        assert_eq!(RegistryRequest::parse("!a:b:80"), None);
    }

    #[test]
    fn add_without_port_is_ignored() {
        assert_eq!(RegistryRequest::parse("!alpha"), None);
        assert_eq!(RegistryRequest::parse("!alpha:"), None);
    }

    #[test]
    fn add_with_empty_id_is_ignored() {
        assert_eq!(RegistryRequest::parse("!:80"), None);
    }

    #[test]
    fn add_with_bad_port_is_ignored() {
        assert_eq!(RegistryRequest::parse("!a:0"), None);
        assert_eq!(RegistryRequest::parse("!a:65536"), None);
        assert_eq!(RegistryRequest::parse("!a:8o"), None);
    }

    #[test]
    fn add_with_carriage_return_in_id_is_ignored() {
        assert_eq!(RegistryRequest::parse("!a\r:80"), None);
    }

    #[test]
    fn parses_query() {
        assert_eq!(
            RegistryRequest::parse("?alpha"),
            Some(RegistryRequest::Query { id: "alpha" })
        );
    }

    #[test]
    fn query_with_colon_is_ignored() {
        assert_eq!(RegistryRequest::parse("?a:b"), None);
    }

    #[test]
    fn dump_dispatches_on_first_char() {
        assert_eq!(RegistryRequest::parse("@"), Some(RegistryRequest::Dump));
        assert_eq!(RegistryRequest::parse("@extra"), Some(RegistryRequest::Dump));
    }

    #[test]
    fn unknown_and_empty_lines_are_ignored() {
        assert_eq!(RegistryRequest::parse(""), None);
        assert_eq!(RegistryRequest::parse("alpha"), None);
        assert_eq!(RegistryRequest::parse("#"), None);
    }

    #[test]
    fn station_log_must_match_exactly() {
        assert_eq!(StationRequest::parse("log"), Some(StationRequest::Log));
        assert_eq!(
            StationRequest::parse("logs"),
            Some(StationRequest::Visit { visitor: "logs" })
        );
        assert_eq!(
            StationRequest::parse("LOG"),
            Some(StationRequest::Visit { visitor: "LOG" })
        );
    }

    #[test]
    fn station_rejects_forbidden_chars() {
        assert_eq!(StationRequest::parse("plane:1"), None);
        assert_eq!(StationRequest::parse("plane\r"), None);
    }

    #[test]
    fn station_accepts_empty_visitor() {
        assert_eq!(
            StationRequest::parse(""),
            Some(StationRequest::Visit { visitor: "" })
        );
    }

    #[test]
    fn request_formatting() {
        assert_eq!(add_request("alpha", 4000), "!alpha:4000");
        assert_eq!(query_request("alpha"), "?alpha");
    }
}
