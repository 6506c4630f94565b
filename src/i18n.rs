//! Message lookup for error objects.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Message {
    InvalidElement,
    InvalidResourceType,
    InvalidIdentifier,
    InvalidValue,
    ValueTooLong,
    ResourceNotFound,
    MalformedDocument,
    UnsupportedMediaType,
}

pub trait Translator: Send + Sync {
    fn get(&self, message: Message) -> String;
}

/// English messages, with per-message overrides.
#[derive(Clone, Debug, Default)]
pub struct DefaultTranslator {
    overrides: HashMap<Message, String>,
}

impl DefaultTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(mut self, message: Message, text: impl Into<String>) -> Self {
        self.overrides.insert(message, text.into());
        self
    }
}

impl Translator for DefaultTranslator {
    fn get(&self, message: Message) -> String {
        if let Some(s) = self.overrides.get(&message) {
            return s.clone();
        }
        match message {
            Message::InvalidElement => "Invalid element.",
            Message::InvalidResourceType => "Invalid resource type.",
            Message::InvalidIdentifier => "Invalid resource identifier.",
            Message::InvalidValue => "Invalid value.",
            Message::ValueTooLong => "Value is too long.",
            Message::ResourceNotFound => "Resource not found.",
            Message::MalformedDocument => "Malformed JSON:API document.",
            Message::UnsupportedMediaType => "Unsupported media type.",
        }
        .to_string()
    }
}
