pub mod discord_client;
pub mod exam_client;

pub use discord_client::DiscordSender;
pub use exam_client::ExamClient;
