//! Telegram transport: the [`MessageGateway`] implementation and the
//! long-polling update loop. Everything teloxide-shaped stays in this
//! module; the core only ever sees [`Event`] values.

use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
};
use tokio::sync::Mutex;
use tracing::warn;

use wakely_core::{
    Button, Command, CoreError, Engine, Event, EventKind, MessageGateway, MessageId, Selection,
    SessionId,
};

// ── Gateway ─────────────────────────────────────────────────────────

pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn delivery(err: teloxide::RequestError) -> CoreError {
    CoreError::Delivery { reason: err.to_string() }
}

fn inline_keyboard(rows: &[Vec<Button>]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

/// Persistent reply keyboard: device names two per row, or an `/add`
/// shortcut when the registry is empty.
fn reply_keyboard(names: &[String]) -> KeyboardMarkup {
    if names.is_empty() {
        return KeyboardMarkup::new(vec![vec![KeyboardButton::new("/add")]]);
    }
    let rows: Vec<Vec<KeyboardButton>> = names
        .chunks(2)
        .map(|pair| pair.iter().map(KeyboardButton::new).collect())
        .collect();
    KeyboardMarkup::new(rows)
}

#[async_trait]
impl MessageGateway for TelegramGateway {
    async fn send_text(&self, session: SessionId, text: &str) -> Result<(), CoreError> {
        self.bot
            .send_message(ChatId(session.0), text)
            .await
            .map_err(delivery)?;
        Ok(())
    }

    async fn send_menu(
        &self,
        session: SessionId,
        text: &str,
        rows: &[Vec<Button>],
    ) -> Result<MessageId, CoreError> {
        let sent = self
            .bot
            .send_message(ChatId(session.0), text)
            .reply_markup(inline_keyboard(rows))
            .await
            .map_err(delivery)?;
        Ok(MessageId(sent.id.0))
    }

    async fn retract(&self, session: SessionId, message: MessageId) -> Result<(), CoreError> {
        self.bot
            .delete_message(ChatId(session.0), teloxide::types::MessageId(message.0))
            .await
            .map_err(delivery)?;
        Ok(())
    }

    async fn refresh_keyboard(
        &self,
        session: SessionId,
        names: &[String],
    ) -> Result<(), CoreError> {
        self.bot
            .send_message(ChatId(session.0), "Keyboard updated with current devices.")
            .reply_markup(reply_keyboard(names))
            .await
            .map_err(delivery)?;
        Ok(())
    }
}

// ── Command registration ────────────────────────────────────────────

pub async fn register_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("wol", "Wake up a device"),
        BotCommand::new("add", "Add a new device"),
        BotCommand::new("modify", "Modify existing device"),
        BotCommand::new("delete", "Delete a device"),
        BotCommand::new("list", "List all devices"),
        BotCommand::new("help", "Show available options"),
    ])
    .await?;
    Ok(())
}

// ── Update loop ─────────────────────────────────────────────────────

/// Long-poll for updates and feed them through the engine, one event
/// processed to completion at a time.
pub async fn run(bot: Bot, engine: Arc<Mutex<Engine>>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_message(msg: Message, engine: Arc<Mutex<Engine>>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let kind = match Command::parse(text) {
        Some(cmd) => EventKind::Command(cmd),
        None => EventKind::Text(text.to_owned()),
    };
    let event = Event { session: SessionId(msg.chat.id.0), kind };

    if let Err(e) = engine.lock().await.handle(event).await {
        warn!(error = %e, "failed to handle message event");
    }
    Ok(())
}

async fn on_callback(
    bot: Bot,
    query: CallbackQuery,
    engine: Arc<Mutex<Engine>>,
) -> ResponseResult<()> {
    // Stop the client-side spinner regardless of what the data holds.
    let _ = bot.answer_callback_query(query.id.clone()).await;

    let Some(message) = query.message else {
        return Ok(());
    };
    let chat = message.chat().id;

    // The tapped prompt is spent; remove it before reacting, like any
    // other transient inline keyboard.
    let _ = bot.delete_message(chat, message.id()).await;

    let Some(selection) = query.data.as_deref().and_then(Selection::parse) else {
        warn!(data = ?query.data, "unrecognized callback payload");
        return Ok(());
    };

    let event = Event {
        session: SessionId(chat.0),
        kind: EventKind::Selection(selection),
    };
    if let Err(e) = engine.lock().await.handle(event).await {
        warn!(error = %e, "failed to handle selection event");
    }
    Ok(())
}
