use crate::session::SessionRef;
use habitat_protocol::InboundMessage;
use std::sync::atomic::{AtomicBool, Ordering};

/// A pre-parsed packet field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Bool(bool),
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Named fields a handler exposes to observers, in wire order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PacketFields(Vec<(&'static str, FieldValue)>);

impl PacketFields {
    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.0.push((name, value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Cancellable wrapper around one inbound packet.
///
/// Observers get a shared reference; cancelling is the only mutation they can
/// make. The carried message is a snapshot positioned at cursor zero.
#[derive(Debug)]
pub struct PacketEvent {
    session: SessionRef,
    header: u16,
    message: InboundMessage,
    fields: PacketFields,
    cancelled: AtomicBool,
}

impl PacketEvent {
    pub(crate) fn new(
        session: SessionRef,
        message: InboundMessage,
        fields: PacketFields,
    ) -> Self {
        Self {
            session,
            header: message.header(),
            message,
            fields,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &SessionRef {
        &self.session
    }

    pub fn header(&self) -> u16 {
        self.header
    }

    /// Raw message at cursor zero. Clone it to parse further.
    pub fn message(&self) -> &InboundMessage {
        &self.message
    }

    pub fn fields(&self) -> &PacketFields {
        &self.fields
    }

    /// Skips the handler body. Cannot be undone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}
