/// Screen view models - Gateway

mod channel;
mod chat;

pub use channel::ChannelView;
pub use chat::ChatView;
