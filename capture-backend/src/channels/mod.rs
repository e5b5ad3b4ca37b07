//! Chat-facing side of the bot: the gateway capability, the per-sender
//! capture state machine and the dispatcher that feeds it.

pub mod capture;
pub mod commands;
pub mod dispatcher;
pub mod gateway;
pub mod session;
pub mod telegram;

#[cfg(test)]
pub mod mock;

pub use capture::CaptureService;
pub use dispatcher::CaptureDispatcher;
pub use gateway::ChatGateway;
pub use telegram::TelegramGateway;
