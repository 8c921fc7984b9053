//! Message payload shapes and preview text.

use serde_json::{json, Value as JsonValue};

pub const MAX_TEXT_CHARS: usize = 2000;
pub const QUOTED_SNIPPET_CHARS: usize = 100;

pub const SYSTEM_MSG_TYPE_EMERGENCY_ALERT: &str = "emergency_alert";

pub const NEW_CHAT_CREATED: &str = "New chat created";
pub const CHAT_ARCHIVED: &str = "This chat has been archived by the owner or an admin.";

pub fn joined_as_admin(name: &str) -> String {
    format!("{} joined as admin", name)
}

pub fn left_the_group(name: &str) -> String {
    format!("{} left the group", name)
}

/// System messages store their text as a bare JSON string
pub fn system_text(text: impl Into<String>) -> JsonValue {
    JsonValue::String(text.into())
}

pub fn text_payload(
    text: &str,
    quoted_message_id: Option<String>,
    quoted_snippet: Option<String>,
) -> JsonValue {
    json!({
        "text": text,
        "quotedMessageId": quoted_message_id,
        "quotedSnippet": quoted_snippet,
    })
}

pub fn image_payload(url: &str) -> JsonValue {
    json!({ "url": url })
}

pub fn location_payload(latitude: f64, longitude: f64) -> JsonValue {
    json!({ "location": { "latitude": latitude, "longitude": longitude } })
}

/// First 100 characters of the quoted text, with `...` when cut
pub fn quoted_snippet(text: &str) -> String {
    if text.chars().count() > QUOTED_SNIPPET_CHARS {
        let cut: String = text.chars().take(QUOTED_SNIPPET_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// The human-readable text inside a payload, if it has one
pub fn plain_text(payload: &JsonValue) -> Option<&str> {
    match payload {
        JsonValue::String(s) => Some(s),
        JsonValue::Object(obj) => ["text", "message", "question"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(JsonValue::as_str)),
        _ => None,
    }
}

/// One-line preview for chat lists and notifications
pub fn preview_text(payload: &JsonValue) -> String {
    if let Some(kind) = payload.get("system_msg_type").and_then(JsonValue::as_str) {
        return match kind {
            SYSTEM_MSG_TYPE_EMERGENCY_ALERT => "🚨 Emergency Alert".to_string(),
            _ => "System message".to_string(),
        };
    }

    let has_coordinates = payload
        .get("location")
        .map(|l| l.get("latitude").is_some() && l.get("longitude").is_some())
        .unwrap_or(false);
    if has_coordinates {
        return "📍 Location shared".to_string();
    }

    for key in ["message", "question", "text"] {
        if let Some(text) = payload.get(key).and_then(JsonValue::as_str) {
            return text.to_string();
        }
    }

    match payload {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}
