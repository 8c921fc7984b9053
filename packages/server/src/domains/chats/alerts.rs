//! Alert interview script.
//!
//! The questions live in external configuration, one script per locale. The
//! interview state is not stored anywhere; it is read back from the chat's
//! `ALERT_QUESTION` messages and whether their latest revision carries a
//! selection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashMap;
use std::path::Path;

use super::errors::{ChatError, ChatResult};

const BUILTIN_SETTINGS: &str = include_str!("../../../config/alert_settings.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertOption {
    pub id: String,
    pub option: String,
    #[serde(default)]
    pub next_question_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertQuestion {
    pub id: String,
    pub key: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<AlertOption>,
}

/// The interview for one locale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertScript {
    pub questions: Vec<AlertQuestion>,
    pub final_response_message: String,
    pub emergency_phone_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSettings {
    pub fallback_locale: String,
    pub locales: HashMap<String, AlertScript>,
}

impl AlertSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alert settings from {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("Invalid alert settings in {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: AlertSettings = serde_json::from_str(raw)?;
        if !settings.locales.contains_key(&settings.fallback_locale) {
            anyhow::bail!(
                "Fallback locale '{}' has no alert script",
                settings.fallback_locale
            );
        }
        Ok(settings)
    }

    /// Settings shipped with the service (de/en/fr)
    pub fn builtin() -> Self {
        Self::from_json(BUILTIN_SETTINGS).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Bundled alert settings are invalid");
            Self::default()
        })
    }

    /// Script for `locale`, falling back to the fallback locale
    pub fn script(&self, locale: &str) -> Option<&AlertScript> {
        self.locales
            .get(locale)
            .or_else(|| self.locales.get(&self.fallback_locale))
    }
}

/// A client's answer, extracted from an update payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertAnswer {
    pub question_ref_id: String,
    pub selected_option: Option<String>,
    pub selected_option_id: Option<String>,
}

fn non_empty_str(payload: &Map<String, JsonValue>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(JsonValue::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

impl AlertAnswer {
    pub fn from_payload(payload: &JsonValue) -> ChatResult<Self> {
        let obj = payload
            .as_object()
            .ok_or_else(|| ChatError::bad_request("Alert answer must be a JSON object"))?;

        let selected_option = non_empty_str(obj, "selectedOption");
        let selected_option_id = non_empty_str(obj, "selectedOptionId");
        if selected_option.is_none() && selected_option_id.is_none() {
            return Err(ChatError::bad_request(
                "Alert answer requires selectedOption or selectedOptionId",
            ));
        }

        let question_ref_id = non_empty_str(obj, "questionRefId")
            .ok_or_else(|| ChatError::bad_request("Alert answer requires questionRefId"))?;

        Ok(Self {
            question_ref_id,
            selected_option,
            selected_option_id,
        })
    }

    /// Binds the answer to the question stored on the message being answered.
    /// A ref naming any other question is rejected.
    pub fn bound_to(self, asked: &JsonValue) -> ChatResult<Self> {
        let stored = asked
            .get("questionRefId")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| {
                ChatError::Internal(anyhow::anyhow!("Alert question has no questionRefId"))
            })?;
        if stored != self.question_ref_id {
            return Err(ChatError::bad_request(
                "questionRefId does not match the question being answered",
            ));
        }
        Ok(self)
    }
}

/// True once the question's latest payload carries a selection
pub fn is_answered(payload: &JsonValue) -> bool {
    ["selectedOption", "selectedOptionId"]
        .iter()
        .any(|key| payload.get(key).map(|v| !v.is_null()).unwrap_or(false))
}

/// What the interview does after an answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep<'a> {
    Ask(&'a AlertQuestion),
    Finish,
}

impl AlertScript {
    pub fn first_question(&self) -> Option<&AlertQuestion> {
        self.questions.first()
    }

    fn find_option<'a>(question: &'a AlertQuestion, answer: &AlertAnswer) -> Option<&'a AlertOption> {
        question.options.iter().find(|o| match &answer.selected_option_id {
            Some(id) => &o.id == id,
            None => answer.selected_option.as_deref() == Some(o.option.as_str()),
        })
    }

    /// Branch via the option's `next_question_key` when it names a known
    /// question, otherwise move to the next question in order. An unknown
    /// question id ends the interview.
    pub fn next_step(&self, answer: &AlertAnswer) -> NextStep<'_> {
        let Some(index) = self
            .questions
            .iter()
            .position(|q| q.id == answer.question_ref_id)
        else {
            return NextStep::Finish;
        };

        let branch = Self::find_option(&self.questions[index], answer)
            .and_then(|o| o.next_question_key.as_deref())
            .and_then(|key| self.questions.iter().find(|q| q.key == key));

        match branch.or_else(|| self.questions.get(index + 1)) {
            Some(question) => NextStep::Ask(question),
            None => NextStep::Finish,
        }
    }

    /// Label of the chosen option, resolved from the id when only the id was sent
    pub fn selected_label(&self, answer: &AlertAnswer) -> Option<String> {
        if let Some(label) = &answer.selected_option {
            return Some(label.clone());
        }
        self.questions
            .iter()
            .find(|q| q.id == answer.question_ref_id)
            .and_then(|q| Self::find_option(q, answer))
            .map(|o| o.option.clone())
    }

    pub fn response_payload(&self) -> JsonValue {
        json!({
            "message": self.final_response_message,
            "phoneNumber": self.emergency_phone_number,
        })
    }
}

/// Revision 0 payload of an unanswered question
pub fn question_payload(question: &AlertQuestion) -> JsonValue {
    json!({
        "question": question.question,
        "options": question
            .options
            .iter()
            .map(|o| json!({ "id": o.id, "option": o.option }))
            .collect::<Vec<_>>(),
        "selectedOption": JsonValue::Null,
        "questionRefId": question.id,
    })
}

/// The answered revision: the question as asked, plus the selection
pub fn answered_payload(current: &JsonValue, answer: &AlertAnswer, label: Option<String>) -> JsonValue {
    let mut merged = current.as_object().cloned().unwrap_or_default();
    merged.insert(
        "selectedOption".into(),
        label.map(JsonValue::String).unwrap_or(JsonValue::Null),
    );
    merged.insert(
        "selectedOptionId".into(),
        answer
            .selected_option_id
            .clone()
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
    );
    merged
        .entry("questionRefId")
        .or_insert_with(|| JsonValue::String(answer.question_ref_id.clone()));
    JsonValue::Object(merged)
}

pub fn emergency_chat_name(locale: &str, name: &str) -> String {
    match locale {
        "de" => format!("Notfall von {}", name),
        "fr" => format!("Urgence de {}", name),
        _ => format!("Emergency from {}", name),
    }
}
