//! Classifying incoming updates.

use telegram::Update;

/// What an update asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/start`
    Start { chat_id: i64 },

    /// `/list [N]`
    List {
        chat_id: i64,
        user_id: i64,
        arg: Option<String>,
    },

    /// `/post ID`
    Post {
        chat_id: i64,
        user_id: i64,
        arg: Option<String>,
    },

    /// Any other text message: a story.
    Story {
        chat_id: i64,
        user_id: i64,
        username: Option<String>,
        text: String,
    },

    /// An inline button press.
    Button {
        query_id: String,
        chat_id: Option<i64>,
        message_id: Option<i64>,
        data: String,
    },

    /// Nothing to do (unknown command, non-text message, anonymous sender).
    Ignore,
}

/// Decide what to do with an update.
pub fn route(update: &Update) -> Route {
    if let Some(query) = &update.callback_query {
        return Route::Button {
            query_id: query.id.clone(),
            chat_id: query.message.as_ref().map(|m| m.chat.id),
            message_id: query.message.as_ref().map(|m| m.message_id),
            data: query.data.clone().unwrap_or_default(),
        };
    }

    let Some(message) = &update.message else {
        return Route::Ignore;
    };
    let (Some(from), Some(text)) = (&message.from, &message.text) else {
        return Route::Ignore;
    };
    let chat_id = message.chat.id;
    let user_id = from.id;

    let Some((command, arg)) = parse_command(text) else {
        return Route::Story {
            chat_id,
            user_id,
            username: from.username.clone(),
            text: text.clone(),
        };
    };

    match command {
        "start" => Route::Start { chat_id },
        "list" => Route::List {
            chat_id,
            user_id,
            arg,
        },
        "post" => Route::Post {
            chat_id,
            user_id,
            arg,
        },
        _ => Route::Ignore,
    }
}

/// Split `/command@botname first-arg ...` into the command and its first
/// argument. Returns `None` for text that is not a command: the slash must be
/// the first character and be followed directly by the command name.
fn parse_command(text: &str) -> Option<(&str, Option<String>)> {
    let rest = text.strip_prefix('/')?;
    let mut parts = rest.split_whitespace();
    let head = parts.next().filter(|_| !rest.starts_with(char::is_whitespace))?;
    let command = head.split('@').next().filter(|c| !c.is_empty())?;
    let arg = parts.next().map(str::to_string);
    Some((command, arg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_update(from: Option<(i64, Option<&str>)>, text: Option<&str>) -> Update {
        let from = from
            .map(|(id, name)| serde_json::json!({ "id": id, "username": name }))
            .unwrap_or(serde_json::Value::Null);
        serde_json::from_value(serde_json::json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "chat": { "id": 500 },
                "from": from,
                "text": text,
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_plain_text_is_a_story() {
        let route = route(&message_update(Some((7, Some("alice"))), Some("My story")));
        assert_eq!(
            route,
            Route::Story {
                chat_id: 500,
                user_id: 7,
                username: Some("alice".to_string()),
                text: "My story".to_string(),
            }
        );
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            route(&message_update(Some((7, None)), Some("/start"))),
            Route::Start { chat_id: 500 }
        );
        assert_eq!(
            route(&message_update(Some((7, None)), Some("/list 5"))),
            Route::List {
                chat_id: 500,
                user_id: 7,
                arg: Some("5".to_string())
            }
        );
        assert_eq!(
            route(&message_update(Some((7, None)), Some("/post@story_bot 12 extra"))),
            Route::Post {
                chat_id: 500,
                user_id: 7,
                arg: Some("12".to_string())
            }
        );
    }

    #[test]
    fn test_unknown_command_is_not_a_story() {
        assert_eq!(
            route(&message_update(Some((7, None)), Some("/help"))),
            Route::Ignore
        );
    }

    #[test]
    fn test_slash_not_at_start_is_a_story() {
        for text in ["  /start", "/ hello", "/", "/@story_bot hi"] {
            assert!(
                matches!(
                    route(&message_update(Some((7, None)), Some(text))),
                    Route::Story { text: ref t, .. } if t == text
                ),
                "{text:?} should be stored as a story"
            );
        }
    }

    #[test]
    fn test_non_text_and_anonymous_messages_ignored() {
        assert_eq!(route(&message_update(Some((7, None)), None)), Route::Ignore);
        assert_eq!(route(&message_update(None, Some("hi"))), Route::Ignore);
    }

    #[test]
    fn test_button_press() {
        let update: Update = serde_json::from_value(serde_json::json!({
            "update_id": 2,
            "callback_query": {
                "id": "q1",
                "from": { "id": 7 },
                "message": { "message_id": 33, "chat": { "id": 500 } },
                "data": "faq"
            }
        }))
        .unwrap();

        assert_eq!(
            route(&update),
            Route::Button {
                query_id: "q1".to_string(),
                chat_id: Some(500),
                message_id: Some(33),
                data: "faq".to_string(),
            }
        );
    }
}
