pub mod chat;
pub mod commands;

pub use chat::{ChannelMessage, ChatClient, ChatSink, ProtocolError};
pub use commands::Command;
