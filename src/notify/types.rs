//! Slack Block Kit subset used by the failure message.

use serde::{Deserialize, Serialize};

/// A message block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    Context {
        elements: Vec<TextObject>,
    },
}

impl Block {
    /// Section with a single mrkdwn text
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: Some(TextObject::mrkdwn(text)),
            fields: Vec::new(),
            accessory: None,
        }
    }

    /// Section made of mrkdwn fields
    pub fn fields(fields: Vec<TextObject>) -> Self {
        Self::Section {
            text: None,
            fields,
            accessory: None,
        }
    }

    /// Context block with a single mrkdwn element
    pub fn context(text: impl Into<String>) -> Self {
        Self::Context {
            elements: vec![TextObject::mrkdwn(text)],
        }
    }

    /// Attach an accessory to a section; other blocks are returned unchanged
    pub fn with_accessory(self, value: Accessory) -> Self {
        match self {
            Self::Section { text, fields, .. } => Self::Section {
                text,
                fields,
                accessory: Some(value),
            },
            other => other,
        }
    }

    /// Text of a section or the first context element
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Section { text, .. } => text.as_ref().map(TextObject::text),
            Self::Context { elements } => elements.first().map(TextObject::text),
        }
    }

    pub fn accessory(&self) -> Option<&Accessory> {
        match self {
            Self::Section { accessory, .. } => accessory.as_ref(),
            Self::Context { .. } => None,
        }
    }
}

/// Text composition object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TextObject {
    #[serde(rename = "mrkdwn")]
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Mrkdwn { text } => text,
        }
    }
}

/// Section accessory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Image { image_url: String, alt_text: String },
}

/// Body of `chat.postMessage`
#[derive(Debug, Clone, Serialize)]
pub struct PostMessage<'a> {
    pub channel: &'a str,
    /// Notification fallback text
    pub text: &'a str,
    pub blocks: &'a [Block],
}
