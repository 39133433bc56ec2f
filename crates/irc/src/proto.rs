//! IRC line parsing. Just the subset the bridge needs: prefix, command,
//! middle params, trailing param, CTCP ACTION.

/// One parsed IRC line, borrowing from the raw input.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct IrcLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: Vec<&'a str>,
    pub trailing: Option<&'a str>,
}

/// Parse `[:prefix] COMMAND param* [ :trailing]`. Returns `None` for lines
/// with no command.
pub(crate) fn parse_line(line: &str) -> Option<IrcLine<'_>> {
    let mut rest = line.trim_end_matches(['\r', '\n']);

    let mut prefix = None;
    if let Some(stripped) = rest.strip_prefix(':') {
        let (p, r) = stripped.split_once(' ')?;
        prefix = Some(p);
        rest = r.trim_start();
    }

    let (main, trailing) = match rest.split_once(" :") {
        Some((m, t)) => (m, Some(t)),
        None => (rest, None),
    };

    let mut parts = main.split_ascii_whitespace();
    let command = parts.next()?;
    Some(IrcLine {
        prefix,
        command,
        params: parts.collect(),
        trailing,
    })
}

/// Extract the nick from a `nick!user@host` prefix. Server prefixes (no
/// `!`) come back whole.
pub(crate) fn prefix_nick(prefix: &str) -> &str {
    prefix.split('!').next().unwrap_or(prefix)
}

/// If `text` is a CTCP ACTION, return the action body.
pub(crate) fn ctcp_action(text: &str) -> Option<&str> {
    text.strip_prefix("\x01ACTION ")?
        .strip_suffix('\x01')
        .map(str::trim_end)
}

/// Strip a channel-mode sigil (`@+%&~`) from a NAMES entry.
pub(crate) fn strip_sigil(name: &str) -> &str {
    name.trim_start_matches(['@', '+', '%', '&', '~'])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_privmsg() {
        let line = parse_line(":dan!~d@host.example PRIVMSG #party :hello world\r\n").unwrap();
        assert_eq!(line.prefix, Some("dan!~d@host.example"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#party"]);
        assert_eq!(line.trailing, Some("hello world"));
    }

    #[test]
    fn parses_ping_without_prefix() {
        let line = parse_line("PING :irc.example.net").unwrap();
        assert_eq!(line.prefix, None);
        assert_eq!(line.command, "PING");
        assert_eq!(line.trailing, Some("irc.example.net"));
    }

    #[test]
    fn parses_numeric_with_params() {
        let line = parse_line(":irc.example.net 353 bot = #party :@op +voice plain").unwrap();
        assert_eq!(line.command, "353");
        assert_eq!(line.params, vec!["bot", "=", "#party"]);
        assert_eq!(line.trailing, Some("@op +voice plain"));
    }

    #[test]
    fn trailing_may_contain_colons() {
        let line = parse_line("PRIVMSG #party :see: this works").unwrap();
        assert_eq!(line.trailing, Some("see: this works"));
    }

    #[test]
    fn empty_line_is_none() {
        assert!(parse_line("").is_none());
        assert!(parse_line("\r\n").is_none());
    }

    #[test]
    fn nick_extraction() {
        assert_eq!(prefix_nick("dan!~d@host"), "dan");
        assert_eq!(prefix_nick("irc.example.net"), "irc.example.net");
    }

    #[test]
    fn ctcp_action_roundtrip() {
        assert_eq!(ctcp_action("\x01ACTION waves\x01"), Some("waves"));
        assert_eq!(ctcp_action("just text"), None);
        assert_eq!(ctcp_action("\x01VERSION\x01"), None);
    }

    #[test]
    fn sigils_are_stripped() {
        assert_eq!(strip_sigil("@op"), "op");
        assert_eq!(strip_sigil("+voiced"), "voiced");
        assert_eq!(strip_sigil("plain"), "plain");
    }
}
