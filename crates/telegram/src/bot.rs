//! Manual long-polling loop against the Telegram Bot API.

use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        prelude::*,
        types::{AllowedUpdate, UpdateKind},
    },
    tracing::{debug, error, info, warn},
};

use partyline_broadcast::{HubHandle, PresenceDebouncer};

use crate::{bridge::Shared, handlers};

/// Delay before retrying after a failed API call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Poll for updates forever. Errors are logged and retried; the hub never
/// sees them.
pub(crate) async fn run_polling(
    shared: Arc<Shared>,
    hub: HubHandle,
    debounce: PresenceDebouncer,
    roster_command: String,
) {
    // The HTTP client timeout must exceed the long-polling timeout (30 s)
    // or the client aborts the request before Telegram responds.
    let client = match teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(45))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!(bridge = %shared.config.id, error = %e, "failed to build telegram http client");
            return;
        },
    };
    let bot = Bot::with_client(shared.config.token.expose_secret(), client);

    // Verify credentials before serving; a bad token only ever logs.
    loop {
        match bot.get_me().await {
            Ok(me) => {
                info!(
                    bridge = %shared.config.id,
                    username = ?me.username,
                    "telegram bot connected"
                );
                break;
            },
            Err(e) => {
                warn!(bridge = %shared.config.id, error = %e, "telegram get_me failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
            },
        }
    }

    // Clear any webhook so long polling works.
    if let Err(e) = bot.delete_webhook().send().await {
        warn!(bridge = %shared.config.id, error = %e, "failed to clear telegram webhook");
    }

    shared.set_bot(bot.clone());

    let mut offset: i32 = 0;
    loop {
        let result = bot
            .get_updates()
            .offset(offset)
            .timeout(30)
            .allowed_updates(vec![AllowedUpdate::Message])
            .await;

        match result {
            Ok(updates) => {
                debug!(
                    bridge = %shared.config.id,
                    count = updates.len(),
                    "got telegram updates"
                );
                for update in updates {
                    offset = update.id.as_offset();
                    if let UpdateKind::Message(msg) = update.kind {
                        handlers::handle_message(
                            &shared,
                            &bot,
                            &hub,
                            &debounce,
                            &roster_command,
                            msg,
                        )
                        .await;
                    }
                }
            },
            Err(e) => {
                warn!(bridge = %shared.config.id, error = %e, "telegram poll failed");
                tokio::time::sleep(RETRY_DELAY).await;
            },
        }
    }
}
