pub mod question;

pub use question::{ButtonSpec, ChoiceData, PollSpec, QuestionData, QuestionMessage};
