//! Inbound Telegram message handling.

use std::sync::Arc;

use {
    teloxide::{
        Bot,
        prelude::Requester,
        types::{Message, User},
    },
    tracing::{debug, trace, warn},
};

use partyline_broadcast::{
    Envelope, HubHandle, PresenceDebouncer, PresenceSource, SenderId,
};

use crate::bridge::Shared;

/// Handle one inbound message from the polling loop.
pub(crate) async fn handle_message(
    shared: &Arc<Shared>,
    bot: &Bot,
    hub: &HubHandle,
    debounce: &PresenceDebouncer,
    roster_command: &str,
    msg: Message,
) {
    if msg.chat.id.0 != shared.config.chat_id {
        trace!(chat_id = msg.chat.id.0, "ignoring message outside bridged chat");
        return;
    }

    // Membership service messages drive presence, not chat.
    if let Some(users) = msg.new_chat_members() {
        for user in users {
            transition(shared, hub, debounce, user, true);
        }
        return;
    }
    if let Some(user) = msg.left_chat_member() {
        transition(shared, hub, debounce, user, false);
        return;
    }

    let Some(user) = msg.from.as_ref() else {
        return;
    };
    if user.is_bot {
        return;
    }
    let Some(text) = msg.text() else {
        // Media without a caption isn't bridged.
        return;
    };

    // A message proves the sender is here. First sighting refreshes the
    // roster but never announces; only real join/leave transitions do.
    if shared.note_peer(user.id.0, display_name(user)) {
        hub.signal_roster_changed();
    }

    if text == roster_command {
        let roster = shared.global_names();
        // An empty cache is skipped rather than echoed: the Telegram API
        // rejects empty message text. The IRC side replies verbatim.
        if roster.is_empty() {
            debug!("no cached roster yet, ignoring query");
            return;
        }
        if let Err(e) = bot.send_message(msg.chat.id, roster).await {
            warn!(bridge = %shared.config.id, error = %e, "failed to answer roster query");
        }
        return;
    }

    hub.push_message(Envelope::message(
        shared.config.id.clone(),
        SenderId::Numeric(user.id.0),
        display_name(user),
        text,
    ));
}

/// Record a join/leave in peer state, refresh the roster immediately, and
/// hand the announcement decision to the debouncer.
fn transition(
    shared: &Arc<Shared>,
    hub: &HubHandle,
    debounce: &PresenceDebouncer,
    user: &User,
    online: bool,
) {
    shared.set_peer(user.id.0, display_name(user), online);
    hub.signal_roster_changed();

    let source: Arc<dyn PresenceSource> = shared.clone();
    debounce.on_transition(
        source,
        shared.config.id.clone(),
        user.id.0,
        display_name(user),
        online,
    );
}

fn display_name(user: &User) -> String {
    user.username
        .clone()
        .unwrap_or_else(|| user.full_name())
}
