//! The normalized message record that flows through the hub, and the
//! renderer that turns it back into plain text for a bridge to write out.

/// Identity of the sender on its own network.
///
/// Networks that address participants by number (Telegram user ids) use
/// [`SenderId::Numeric`]; networks that only know display names (IRC) use
/// [`SenderId::NameOnly`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderId {
    Numeric(u64),
    NameOnly,
}

/// What an envelope announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    /// An ordinary chat message (or narrated action).
    Message,
    /// A participant came online / joined the conversation.
    Joined,
    /// A participant went offline / left the conversation.
    Left,
}

/// One message or presence event, normalized for broadcast.
///
/// For [`StatusKind::Joined`] and [`StatusKind::Left`] the `text` field is
/// ignored; the renderer synthesizes the announcement from the sender name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Bridge identifier of the network this envelope originated on.
    pub origin: String,
    pub sender: SenderId,
    pub sender_name: String,
    pub text: String,
    /// True if the message is a narrated action ("/me waves") rather than
    /// literal speech.
    pub is_action: bool,
    pub status: StatusKind,
}

impl Envelope {
    /// An ordinary chat message.
    pub fn message(
        origin: impl Into<String>,
        sender: SenderId,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            sender,
            sender_name: sender_name.into(),
            text: text.into(),
            is_action: false,
            status: StatusKind::Message,
        }
    }

    /// A narrated action.
    pub fn action(
        origin: impl Into<String>,
        sender: SenderId,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            is_action: true,
            ..Self::message(origin, sender, sender_name, text)
        }
    }

    /// A join/leave announcement. `kind` must not be [`StatusKind::Message`].
    pub fn status(
        origin: impl Into<String>,
        sender: SenderId,
        sender_name: impl Into<String>,
        kind: StatusKind,
    ) -> Self {
        Self {
            origin: origin.into(),
            sender,
            sender_name: sender_name.into(),
            text: String::new(),
            is_action: false,
            status: kind,
        }
    }

    /// Render the envelope as plain text, safe to write to any network.
    ///
    /// `Message` renders as `"name: text"`, `Joined` as `"<- name"`, `Left`
    /// as `"name ->"`. The sender name is sanitized first; an empty name
    /// renders as an empty string and callers must tolerate that.
    pub fn render(&self) -> String {
        let name = sanitize_name(&self.sender_name);
        match self.status {
            StatusKind::Message => format!("{name}: {}", self.text),
            StatusKind::Joined => format!("<- {name}"),
            StatusKind::Left => format!("{name} ->"),
        }
    }
}

/// Strip every character outside `[A-Za-z0-9 _-]` from a display name.
///
/// Keeps rendered names safe on every bridged network regardless of what the
/// origin network allows in nicknames.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_sanitized(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
    }

    #[test]
    fn sanitize_keeps_allowed_alphabet() {
        assert_eq!(sanitize_name("alice_9 -ok"), "alice_9 -ok");
    }

    #[test]
    fn sanitize_strips_punctuation_and_controls() {
        assert_eq!(sanitize_name("al!ce@\x01\x02[]{}"), "alce");
        assert_eq!(sanitize_name("\t\r\n"), "");
    }

    #[test]
    fn sanitize_strips_non_ascii_letters() {
        assert_eq!(sanitize_name("Zoë_99"), "Zo_99");
    }

    #[test]
    fn sanitize_empty_name() {
        assert_eq!(sanitize_name(""), "");
        assert_eq!(sanitize_name("!!!"), "");
    }

    #[test]
    fn render_ordinary_message() {
        let env = Envelope::message("irc", SenderId::NameOnly, "bob", "hello there");
        assert_eq!(env.render(), "bob: hello there");
    }

    #[test]
    fn render_sanitizes_sender_name() {
        let env = Envelope::message("irc", SenderId::NameOnly, "b@b!", "hi");
        assert_eq!(env.render(), "bb: hi");
    }

    #[test]
    fn render_join_and_part() {
        let join = Envelope::status("tox", SenderId::Numeric(7), "Zoë_99", StatusKind::Joined);
        assert_eq!(join.render(), "<- Zo_99");

        let part = Envelope::status("tox", SenderId::Numeric(7), "Dan", StatusKind::Left);
        assert_eq!(part.render(), "Dan ->");
    }

    #[test]
    fn render_never_leaks_unsafe_name_chars() {
        for name in ["\x00evil\x7f", "name\u{202e}", "<script>", "a,b.c;d"] {
            let join = Envelope::status("x", SenderId::NameOnly, name, StatusKind::Joined);
            assert!(is_sanitized(&join.render()[3..]), "name {name:?} leaked");
            let part = Envelope::status("x", SenderId::NameOnly, name, StatusKind::Left);
            let rendered = part.render();
            assert!(is_sanitized(&rendered[..rendered.len() - 3]));
        }
    }

    #[test]
    fn render_empty_name_message() {
        let env = Envelope::message("irc", SenderId::NameOnly, "", "text");
        assert_eq!(env.render(), ": text");
    }

    #[test]
    fn action_sets_flag() {
        let env = Envelope::action("irc", SenderId::NameOnly, "bob", "waves");
        assert!(env.is_action);
        assert_eq!(env.status, StatusKind::Message);
    }
}
