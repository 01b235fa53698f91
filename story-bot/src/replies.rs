//! Everything the bot says to users and admins.

use story_core::{PublishMode, PublishOutcome, SubmitOutcome};
use telegram::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

pub const HOW_TO: &str = "how_to";
pub const FAQ: &str = "faq";
pub const BACK_TO_START: &str = "back_to_start";

const WELCOME: &str = "💖 Hi there!

This is a safe place to share what is on your mind 💬

No judgement, no names 🌷

If you like, write your story right here.

I will keep it anonymous 💌";

const HOW_TO_TEXT: &str = "<b>📖 How to send a story</b>

<b>Step 1:</b> Write your story
Just start typing in this chat and tell whatever is on your mind.

<b>Step 2:</b> Send the message
Press \"Send\" (or Enter). That's it!

<b>Step 3:</b> Get a confirmation
The bot confirms that your story was received.

<b>💡 Tips:</b>
• Put the whole story in one message
• Be honest
• Don't worry, it is completely anonymous!

<i>Ready? Write your story right now!</i>";

/// A reply ready to be sent or shown in place of an earlier message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parse_mode: Some(ParseMode::Html),
            keyboard: None,
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboardMarkup) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// `/start` and the "back" button.
pub fn welcome() -> Reply {
    Reply::plain(WELCOME).with_keyboard(InlineKeyboardMarkup::single_column([
        InlineKeyboardButton::callback("📖 How do I send a story?", HOW_TO),
        InlineKeyboardButton::callback("❓ FAQ", FAQ),
    ]))
}

pub fn how_to() -> Reply {
    Reply::html(HOW_TO_TEXT).with_keyboard(back_keyboard())
}

/// The FAQ answer about publication speed depends on the mode.
pub fn faq(mode: PublishMode) -> Reply {
    let speed = match mode {
        PublishMode::Auto => "Instantly! The bot publishes your story as soon as you send it.",
        PublishMode::Manual => "After a moderator reviews it. This usually does not take long.",
    };

    Reply::html(format!(
        "<b>❓ Frequently asked questions</b>

<b>Q: Is it really anonymous?</b>
A: Yes! Your name and contacts are never published.

<b>Q: Who will see my story?</b>
A: It is published anonymously; nobody will know who wrote it.

<b>Q: Can I delete my story?</b>
A: Write to the administrator after it is published.

<b>Q: How fast is a story published?</b>
A: {speed}

<b>Q: Can I send several stories?</b>
A: Yes, send as many as you like!

<b>Q: What if I sent the wrong thing?</b>
A: Contact the administrator."
    ))
    .with_keyboard(back_keyboard())
}

fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::single_column([InlineKeyboardButton::callback(
        "◀️ Back",
        BACK_TO_START,
    )])
}

/// Screen for an inline button, if the button is known.
pub fn for_button(data: &str, mode: PublishMode) -> Option<Reply> {
    match data {
        HOW_TO => Some(how_to()),
        FAQ => Some(faq(mode)),
        BACK_TO_START => Some(welcome()),
        _ => None,
    }
}

/// Confirmation for a submitted story. Blank submissions get no reply.
pub fn for_submission(outcome: &SubmitOutcome) -> Option<Reply> {
    let reply = match outcome {
        SubmitOutcome::Rejected => return None,
        SubmitOutcome::SavedAndPublished(_) => Reply::html(
            "✅ <b>Story received and published!</b>

💬 Your story is out. Thank you for trusting us!

📖 Want to share another one? Just send it as your next message.",
        )
        .with_keyboard(InlineKeyboardMarkup::single_column([
            InlineKeyboardButton::callback("📝 Send another story", BACK_TO_START),
        ])),
        SubmitOutcome::SavedNotPublished(_) => Reply::plain(
            "💌 Your story was received and saved, but could not be published right now. \
             An administrator can publish it later.",
        ),
        SubmitOutcome::SavedPendingModeration(_) => Reply::html(
            "💌 <b>Story received!</b>

Thank you! Your story is saved anonymously and will be reviewed for publication.",
        ),
        SubmitOutcome::SaveFailed => {
            Reply::plain("❌ Something went wrong while saving your story. Please try again later.")
        }
    };
    Some(reply)
}

/// Answer to an admin's `/post`.
pub fn for_publish(outcome: &PublishOutcome) -> Reply {
    match outcome {
        PublishOutcome::Published(id) => Reply::plain(format!("✅ Story #{id} published!")),
        PublishOutcome::NotFound(id) => Reply::plain(format!("❌ Story #{id} not found.")),
        PublishOutcome::PublishFailed(_, _) => Reply::plain(
            "❌ Could not publish. Check CHANNEL_ID and the bot's rights in the channel.",
        ),
    }
}

/// Shown to admins when reading the log fails.
pub fn storage_error() -> Reply {
    Reply::plain("❌ Could not read the story log. See the bot logs for details.")
}
