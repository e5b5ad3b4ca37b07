pub mod inbound_message;
pub mod message_content;

pub use inbound_message::{
    EntityKind, ImageAttachment, ImageVariant, InboundMessage, SessionId, TextEntity,
};
pub use message_content::{MessageContent, UNTITLED};
