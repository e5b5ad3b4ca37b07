//! Bot commands and the fixed texts the bot replies with

use crate::models::InboundMessage;

pub const WELCOME: &str = "👋 Hi! I save your messages as notes in your Obsidian vault.\n\n\
Send me text or a photo, then reply with tags like #ideas #work. \
A reply without any #tag saves the note untagged.\n\n\
/cancel drops a note that is waiting for tags.";

pub const TAG_PROMPT: &str =
    "🏷 Send tags for this note, e.g. #ideas #work. A reply without # saves it untagged.";

pub const BUSY: &str =
    "⏳ A note is still waiting for tags. Send tags first, or /cancel to drop it.";

pub const CANCELLED: &str = "🗑 Pending note dropped.";

pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    /// Any other `/word`
    Unknown,
}

impl Command {
    pub fn parse(message: &InboundMessage) -> Option<Self> {
        let name = message.command()?;
        Some(match name.as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "cancel" => Command::Cancel,
            _ => Command::Unknown,
        })
    }
}
