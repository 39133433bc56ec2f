//! The long-running IRC session: connect, register, serve, reconnect.

use std::{sync::Arc, time::Duration};

use {
    rustls::pki_types::ServerName,
    secrecy::ExposeSecret,
    tokio::{
        io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
        net::TcpStream,
        sync::mpsc,
    },
    tracing::{debug, info, trace, warn},
};

use partyline_broadcast::{Envelope, HubHandle, SenderId, StatusKind};

use crate::{
    bridge::Shared,
    error::{Error, Result},
    proto, tls,
};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Connection loop with reconnect. Never returns; a dead session is logged
/// and retried, invisible to the hub.
pub(crate) async fn run(shared: Arc<Shared>, hub: HubHandle, roster_command: String) {
    let session = Session {
        shared,
        hub,
        roster_command,
    };
    let mut backoff = INITIAL_BACKOFF;

    loop {
        info!(server = %session.shared.config.server, "connecting to irc");
        match session.connect_and_run().await {
            Ok(()) => {
                debug!(server = %session.shared.config.server, "irc session closed");
                backoff = INITIAL_BACKOFF;
            },
            Err(e) => {
                warn!(server = %session.shared.config.server, error = %e, "irc session error");
            },
        }

        session.shared.mark_disconnected();
        session.hub.signal_roster_changed();

        info!(delay_ms = backoff.as_millis() as u64, "reconnecting after delay");
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

struct Session {
    shared: Arc<Shared>,
    hub: HubHandle,
    roster_command: String,
}

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

impl Session {
    /// Single connection attempt: connect, register, then serve lines until
    /// the server closes the stream.
    async fn connect_and_run(&self) -> Result<()> {
        let config = &self.shared.config;
        let stream = TcpStream::connect(&config.server).await?;

        let (reader, mut writer): (BoxedReader, BoxedWriter) = if config.tls {
            let connector = tls::connector(config)?;
            let host = config
                .server
                .rsplit_once(':')
                .map_or(config.server.as_str(), |(h, _)| h)
                .to_string();
            let name = ServerName::try_from(host.clone())
                .map_err(|_| Error::BadServerName { host })?;
            let tls_stream = connector.connect(name, stream).await?;
            let (r, w) = tokio::io::split(tls_stream);
            (Box::new(r), Box::new(w))
        } else {
            let (r, w) = stream.into_split();
            (Box::new(r), Box::new(w))
        };

        let mut reader = BufReader::new(reader);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        self.shared.set_outbound(out_tx);
        self.shared.set_nick(config.nick.clone());

        let password = config.server_password.expose_secret();
        if !password.is_empty() {
            write_line(&mut writer, &format!("PASS {password}")).await?;
        }
        write_line(&mut writer, &format!("NICK {}", config.nick)).await?;
        write_line(
            &mut writer,
            &format!("USER {} 0 * :{}", config.user, config.realname),
        )
        .await?;

        // Lines are read as raw bytes and decoded lossily: IRC has no
        // charset, and one Latin-1 message must not kill the session.
        let mut buf = Vec::new();
        loop {
            tokio::select! {
                read = reader.read_until(b'\n', &mut buf) => {
                    if read? == 0 {
                        return Ok(());
                    }
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    buf.clear();
                    self.handle_line(&line);
                },
                queued = out_rx.recv() => match queued {
                    Some(line) => write_line(&mut writer, &line).await?,
                    None => return Ok(()),
                },
            }
        }
    }

    fn handle_line(&self, raw: &str) {
        trace!(line = raw, "irc <-");
        let Some(line) = proto::parse_line(raw) else {
            return;
        };
        let nick = line.prefix.map(proto::prefix_nick).unwrap_or_default();
        let shared = &self.shared;

        match line.command {
            "PING" => shared.raw(format!("PONG :{}", line.trailing.unwrap_or_default())),

            // Welcome: registration done. The server prefix becomes our
            // bridge id unless one was configured.
            "001" => {
                if shared.id().is_empty() {
                    if let Some(prefix) = line.prefix {
                        shared.set_id(prefix);
                    }
                }
                shared.set_connected(true);
                info!(
                    bridge = %shared.id(),
                    channel = %shared.config.channel,
                    "irc registered, joining channel"
                );
                shared.raw(format!("JOIN {}", shared.config.channel));
            },

            // Nick collision: retry with a trailing underscore.
            "433" => {
                let fallback = format!("{}_", shared.nick());
                warn!(nick = %fallback, "nick in use, retrying");
                shared.raw(format!("NICK {fallback}"));
                shared.set_nick(fallback);
            },

            // NAMES reply; accumulates until 366 because large channels
            // span several 353 lines.
            "353" => {
                let own = shared.nick();
                let names = line
                    .trailing
                    .unwrap_or_default()
                    .split_ascii_whitespace()
                    .map(proto::strip_sigil)
                    .filter(|name| *name != own)
                    .map(String::from);
                shared.buffer_names(names);
            },

            // End of NAMES: the fresh list replaces the old one.
            "366" => {
                shared.commit_names();
                self.hub.signal_roster_changed();
            },

            "PRIVMSG" => self.handle_privmsg(nick, &line),

            "JOIN" => {
                shared.request_names();
                if nick != shared.nick() {
                    self.hub.push_message(Envelope::status(
                        shared.id(),
                        SenderId::NameOnly,
                        nick,
                        StatusKind::Joined,
                    ));
                }
            },

            "PART" | "QUIT" => {
                shared.request_names();
                if nick != shared.nick() {
                    self.hub.push_message(Envelope::status(
                        shared.id(),
                        SenderId::NameOnly,
                        nick,
                        StatusKind::Left,
                    ));
                }
            },

            "KICK" => {
                let kicked = line.params.get(1).copied().unwrap_or_default();
                shared.request_names();
                if kicked == shared.nick() {
                    info!(channel = %shared.config.channel, "kicked, rejoining");
                    shared.raw(format!("JOIN {}", shared.config.channel));
                } else {
                    self.hub.push_message(Envelope::status(
                        shared.id(),
                        SenderId::NameOnly,
                        kicked,
                        StatusKind::Left,
                    ));
                }
            },

            // Someone renamed; let NAMES catch the roster up.
            "NICK" => shared.request_names(),

            _ => trace!(command = line.command, "unhandled irc command"),
        }
    }

    fn handle_privmsg(&self, nick: &str, line: &proto::IrcLine<'_>) {
        let shared = &self.shared;
        let target = line.params.first().copied().unwrap_or_default();
        if target != shared.config.channel {
            trace!(target, "ignoring message outside bridged channel");
            return;
        }
        let text = line.trailing.unwrap_or_default();

        if text == self.roster_command {
            shared.privmsg(&shared.config.channel, &shared.global_names());
            return;
        }

        let envelope = match proto::ctcp_action(text) {
            Some(action) => Envelope::action(shared.id(), SenderId::NameOnly, nick, action),
            None => Envelope::message(shared.id(), SenderId::NameOnly, nick, text),
        };
        self.hub.push_message(envelope);
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &str) -> Result<()> {
    trace!(line, "irc ->");
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use partyline_broadcast::{BridgeAdapter, BroadcastHub};
    use partyline_config::IrcBridgeConfig;

    use super::*;

    struct Sink {
        sent: Mutex<Vec<Envelope>>,
    }

    impl Sink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<Envelope> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BridgeAdapter for Sink {
        fn id(&self) -> String {
            "sink".to_string()
        }

        async fn send(&self, envelope: &Envelope) {
            self.sent.lock().unwrap().push(envelope.clone());
        }

        async fn local_names(&self) -> Vec<String> {
            Vec::new()
        }

        async fn set_global_names(&self, _names: String) {}
    }

    fn fixture() -> (
        Session,
        Arc<Sink>,
        mpsc::UnboundedReceiver<String>,
        tokio::task::JoinHandle<()>,
    ) {
        let config = IrcBridgeConfig {
            id: "irc".to_string(),
            channel: "#party".to_string(),
            ..Default::default()
        };
        let shared = Arc::new(Shared::new(config));
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        shared.set_outbound(out_tx);

        let (mut hub, handle) = BroadcastHub::new();
        let sink = Sink::new();
        hub.register(sink.clone());
        let running = tokio::spawn(hub.run());

        let session = Session {
            shared,
            hub: handle,
            roster_command: "!on".to_string(),
        };
        (session, sink, out_rx, running)
    }

    #[tokio::test]
    async fn roster_command_replies_from_cache_without_envelope() {
        let (session, sink, mut out_rx, running) = fixture();
        session.shared.set_global_names("irc: alice - tox: Carl".to_string());

        session.handle_line(":dan!~d@host PRIVMSG #party :!on");

        assert_eq!(
            out_rx.try_recv().unwrap(),
            "PRIVMSG #party :irc: alice - tox: Carl"
        );
        drop(session);
        running.await.unwrap();
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn roster_command_as_substring_is_ordinary_text() {
        let (session, sink, mut out_rx, running) = fixture();

        session.handle_line(":dan!~d@host PRIVMSG #party :well !on then");

        assert!(out_rx.try_recv().is_err());
        drop(session);
        running.await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].origin, "irc");
        assert_eq!(sent[0].sender, SenderId::NameOnly);
        assert_eq!(sent[0].render(), "dan: well !on then");
    }

    #[tokio::test]
    async fn ctcp_action_becomes_action_envelope() {
        let (session, sink, _out_rx, running) = fixture();

        session.handle_line(":dan!~d@host PRIVMSG #party :\u{1}ACTION waves\u{1}");

        drop(session);
        running.await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_action);
        assert_eq!(sent[0].text, "waves");
    }

    #[tokio::test]
    async fn messages_outside_bridged_channel_are_ignored() {
        let (session, sink, _out_rx, running) = fixture();

        session.handle_line(":dan!~d@host PRIVMSG #other :hello");

        drop(session);
        running.await.unwrap();
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn latin1_line_is_decoded_lossily_not_fatal() {
        use tokio::{io::AsyncWriteExt as _, net::TcpListener};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b":dan!~d@host PRIVMSG #party :caf\xe9\r\n")
                .await
                .unwrap();
            socket
                .write_all(b":dan!~d@host PRIVMSG #party :hello\r\n")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let config = IrcBridgeConfig {
            id: "irc".to_string(),
            server: addr.to_string(),
            channel: "#party".to_string(),
            ..Default::default()
        };
        let (mut hub, handle) = BroadcastHub::new();
        let sink = Sink::new();
        hub.register(sink.clone());
        let running = tokio::spawn(hub.run());

        let session = Session {
            shared: Arc::new(Shared::new(config)),
            hub: handle,
            roster_command: "!on".to_string(),
        };
        let result = session.connect_and_run().await;
        assert!(result.is_ok(), "session must survive a non-UTF-8 line");
        server.await.unwrap();

        drop(session);
        running.await.unwrap();

        let texts: Vec<String> = sink.sent().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["caf\u{fffd}", "hello"]);
    }

    #[tokio::test]
    async fn join_announces_immediately_and_refreshes_names() {
        let (session, sink, mut out_rx, running) = fixture();

        session.handle_line(":dan!~d@host JOIN #party");

        assert_eq!(out_rx.try_recv().unwrap(), "NAMES #party");
        drop(session);
        running.await.unwrap();

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].status, StatusKind::Joined);
        assert_eq!(sent[0].render(), "<- dan");
    }
}
