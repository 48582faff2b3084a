use thiserror::Error;

use super::{CounterId, ElementId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RevealError {
    #[error("no revealable element registered as {0:?}")]
    UnknownElement(ElementId),

    #[error("no counter registered as {0:?}")]
    UnknownCounter(CounterId),

    #[error("reveal coordinator already started")]
    AlreadyStarted,

    #[error("dom call failed: {0}")]
    Dom(String),
}

impl RevealError {
    pub fn dom(value: &wasm_bindgen::JsValue) -> Self {
        let message = value
            .as_string()
            .unwrap_or_else(|| format!("{:?}", value));
        RevealError::Dom(message)
    }
}
