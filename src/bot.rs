//! Telegram transport layer.
//!
//! Long-polling bot that authorizes the single configured operator,
//! routes commands to the execution core and filesystem helpers, and
//! adapts Telegram messages to the [`DisplaySink`] contract. The core
//! takes no part in authorization; the guard lives here, before dispatch.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, InputFile, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};

use crate::config::Config;
use crate::exec::output::head_chars;
use crate::exec::session::MESSAGE_BUDGET;
use crate::sink::{DisplaySink, RenderMode, SinkError, SinkResult};
use crate::{exec, files, olog, olog_error, olog_warn, Result};

/// Display sink backed by one Telegram chat.
///
/// `post` sends a fresh message and remembers its id; `update` edits that
/// message in place, which is how progress streams into a single bubble.
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
    message_id: Option<MessageId>,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            message_id: None,
        }
    }
}

fn map_request_error(e: RequestError) -> SinkError {
    match e {
        RequestError::Api(ApiError::MessageNotModified) => SinkError::Unchanged,
        other => SinkError::Channel(other.to_string()),
    }
}

#[async_trait]
impl DisplaySink for TelegramSink {
    async fn post(&mut self, text: &str, mode: RenderMode) -> SinkResult {
        let mut request = self.bot.send_message(self.chat_id, text);
        if mode == RenderMode::Monospace {
            request = request.parse_mode(ParseMode::Markdown);
        }
        let sent = request.await.map_err(map_request_error)?;
        self.message_id = Some(sent.id);
        Ok(())
    }

    async fn update(&mut self, text: &str, mode: RenderMode) -> SinkResult {
        let Some(message_id) = self.message_id else {
            return self.post(text, mode).await;
        };
        let mut request = self.bot.edit_message_text(self.chat_id, message_id, text);
        if mode == RenderMode::Monospace {
            request = request.parse_mode(ParseMode::Markdown);
        }
        request.await.map(|_| ()).map_err(map_request_error)
    }
}

/// Start the bot and serve the operator until shutdown.
pub async fn run_bot(config: Config) -> Result<()> {
    config.ensure_dirs()?;

    if which::which(config.effective_shell()).is_err() {
        olog_warn!(
            "shell `{}` not found on PATH; /run will fail to spawn",
            config.effective_shell()
        );
    }

    let bot = Bot::new(&config.bot_token);

    let commands = vec![
        BotCommand::new("start", "Start the bot and show help"),
        BotCommand::new("help", "Show help message"),
        BotCommand::new("run", "Execute a shell command (e.g. /run ls -l)"),
        BotCommand::new("pwd", "Show current working directory"),
        BotCommand::new("ls", "List directory contents (e.g. /ls uploads)"),
        BotCommand::new("upload", "Prompt to upload a file"),
        BotCommand::new("download", "Download a file (e.g. /download path/to/file)"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        olog_warn!("failed to register bot commands: {e}");
    }

    olog!("Bot started. Using long polling.");
    let config = Arc::new(config);
    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let config = config.clone();
        async move { handle_message(bot, msg, config).await }
    })
    .await;

    Ok(())
}

/// Authorization guard plus command routing. Every core operation behind
/// this point may assume the requester is the operator.
async fn handle_message(bot: Bot, msg: Message, config: Arc<Config>) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    if user.id.0 != config.operator_id {
        olog_warn!("Unauthorized access denied for {}", user.id.0);
        bot.send_message(chat_id, "Sorry, you are not authorized to use this bot.")
            .await?;
        return Ok(());
    }

    if msg.document().is_some() {
        return handle_document(&bot, chat_id, &msg, &config).await;
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.starts_with("/run") {
        handle_run(&bot, chat_id, text, &config).await
    } else if text.starts_with("/pwd") {
        handle_pwd(&bot, chat_id).await
    } else if text.starts_with("/ls") {
        handle_ls(&bot, chat_id, text).await
    } else if text.starts_with("/upload") {
        handle_upload_prompt(&bot, chat_id, &config).await
    } else if text.starts_with("/download") {
        handle_download(&bot, chat_id, text).await
    } else if text.starts_with("/start") || text.starts_with("/help") {
        handle_help(&bot, chat_id, &config).await
    } else {
        Ok(())
    }
}

async fn handle_help(bot: &Bot, chat_id: ChatId, config: &Config) -> ResponseResult<()> {
    let upload_dir = config
        .upload_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unavailable)".to_string());
    let help = format!(
        "I am your host control bot.\n\n\
         *Available commands:*\n\
         /run `<command>` - Execute a shell command.\n\
         /upload - Prompt to upload a file; then send it as a document.\n\
         /download `<path>` - Download a file from the host.\n\
         /pwd - Show current working directory.\n\
         /ls `<path>` - List directory contents (optional path).\n\
         /help - Show this help message.\n\n\
         *Upload directory:* `{upload_dir}`\n\n\
         ⚠️ Use with caution, especially /run."
    );
    bot.send_message(chat_id, help)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

async fn handle_run(bot: &Bot, chat_id: ChatId, text: &str, config: &Config) -> ResponseResult<()> {
    let command = text.strip_prefix("/run").unwrap_or("").trim();
    if command.is_empty() {
        bot.send_message(chat_id, "Usage: /run <command>\nExample: /run ls -l")
            .await?;
        return Ok(());
    }

    let mut sink = TelegramSink::new(bot.clone(), chat_id);
    // The session reports success, failure, and errors through the sink;
    // nothing further to send here.
    let _ = exec::run(config.effective_shell(), command, &mut sink).await;
    Ok(())
}

async fn handle_pwd(bot: &Bot, chat_id: ChatId) -> ResponseResult<()> {
    let reply = match std::env::current_dir() {
        Ok(cwd) => format!("Current working directory:\n`{}`", cwd.display()),
        Err(e) => format!("❌ Error reading working directory: {e}"),
    };
    bot.send_message(chat_id, reply)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

async fn handle_ls(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    let arg = text.strip_prefix("/ls").unwrap_or("").trim();
    let target = if arg.is_empty() { "." } else { arg };

    if files::has_parent_components(target) {
        bot.send_message(chat_id, "Error: '..' path components are not allowed.")
            .await?;
        return Ok(());
    }

    let reply = match files::list_dir(Path::new(target)) {
        Ok(listing) if listing.is_empty() => format!("Directory is empty: `{target}`"),
        Ok(listing) => {
            let text = format!("Contents of `{target}`:\n```\n{listing}\n```");
            if text.chars().count() > MESSAGE_BUDGET {
                format!("{}\n... (listing truncated)", head_chars(&text, MESSAGE_BUDGET))
            } else {
                text
            }
        }
        Err(e) => {
            olog_error!("listing `{target}` failed: {e}");
            format!("❌ Error listing directory: {e}")
        }
    };
    bot.send_message(chat_id, reply)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

async fn handle_upload_prompt(bot: &Bot, chat_id: ChatId, config: &Config) -> ResponseResult<()> {
    let reply = match config.upload_dir() {
        Ok(dir) => format!(
            "Okay, send the file you want to upload to `{}` as a document.",
            dir.display()
        ),
        Err(e) => format!("❌ Upload directory unavailable: {e}"),
    };
    bot.send_message(chat_id, reply)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

async fn handle_download(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    let arg = text.strip_prefix("/download").unwrap_or("").trim();
    if arg.is_empty() {
        bot.send_message(
            chat_id,
            "Usage: /download <path>\nExample: /download uploads/report.txt",
        )
        .await?;
        return Ok(());
    }

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(e) => {
            bot.send_message(chat_id, format!("❌ Error reading working directory: {e}"))
                .await?;
            return Ok(());
        }
    };

    match files::resolve_within(&cwd, arg) {
        Ok(path) => {
            olog!("Sending file: {}", path.display());
            bot.send_document(chat_id, InputFile::file(path)).await?;
        }
        Err(e) => {
            olog_warn!("download `{arg}` rejected: {e}");
            bot.send_message(chat_id, format!("❌ Error sending file: {e}"))
                .await?;
        }
    }
    Ok(())
}

/// Save an incoming document under the configured upload directory.
async fn handle_document(
    bot: &Bot,
    chat_id: ChatId,
    msg: &Message,
    config: &Config,
) -> ResponseResult<()> {
    let Some(doc) = msg.document() else {
        return Ok(());
    };
    let name = doc
        .file_name
        .clone()
        .unwrap_or_else(|| "uploaded_file".to_string());

    let safe_name = match files::sanitize_upload_name(&name) {
        Ok(safe) => safe,
        Err(e) => {
            bot.send_message(chat_id, format!("❌ {e}")).await?;
            return Ok(());
        }
    };
    let dest_dir = match config.upload_dir() {
        Ok(dir) => dir,
        Err(e) => {
            bot.send_message(chat_id, format!("❌ Upload directory unavailable: {e}"))
                .await?;
            return Ok(());
        }
    };

    olog!("Receiving file `{name}` into {}", dest_dir.display());
    let file_id = doc.file.id.clone();
    let file = bot.get_file(&file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let bytes = match reqwest::get(&url).await {
        Ok(resp) => match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                bot.send_message(chat_id, format!("❌ Error uploading file: {e}"))
                    .await?;
                return Ok(());
            }
        },
        Err(e) => {
            bot.send_message(chat_id, format!("❌ Error uploading file: {e}"))
                .await?;
            return Ok(());
        }
    };

    let dest = dest_dir.join(&safe_name);
    let reply = match tokio::fs::write(&dest, &bytes).await {
        Ok(()) => {
            olog!("File `{safe_name}` saved to {}", dest.display());
            format!(
                "✅ File `{safe_name}` uploaded to `{}` ({} bytes).",
                dest_dir.display(),
                bytes.len()
            )
        }
        Err(e) => {
            olog_error!("saving `{safe_name}` failed: {e}");
            format!("❌ Error uploading file: {e}")
        }
    };
    bot.send_message(chat_id, reply)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}
