//! 消息格式化 - 业务能力层
//!
//! 把结构化题目转换成三种发送载荷：文本消息、投票、交互按钮。
//! 全部是纯函数，选项顺序在任何转换中都保持不变。

use crate::config::Config;
use crate::models::{ButtonSpec, PollSpec, QuestionData, QuestionMessage};

/// 题干为空时的占位文本
const QUESTION_PLACEHOLDER: &str = "Question";

/// 投票标题（题干单独发送，标题用固定短文案）
const POLL_TITLE: &str = "本日の過去問";

/// 投票最多容纳的答案数
const POLL_MAX_ANSWERS: usize = 10;

/// 投票答案的最大字符数
const POLL_ANSWER_MAX_CHARS: usize = 55;

/// 超长投票答案截断后保留的字符数
const POLL_ANSWER_TRUNCATED_CHARS: usize = 52;

/// 一条消息最多附带的按钮数
const MAX_BUTTONS: usize = 25;

/// 按钮标签的最大字符数
const BUTTON_LABEL_MAX_CHARS: usize = 80;

/// 揭晓答案按钮的固定标识
pub const REVEAL_CUSTOM_ID: &str = "answer";

/// 选项按钮标识前缀（后接选项下标）
pub const CHOICE_CUSTOM_ID_PREFIX: &str = "choice_";

/// 构造问题文本消息
///
/// 正文 = 题干（空时用占位文本）+ 空行 + 每个选项一行 "label. text"，
/// 退化成 "." 的选项行跳过；图片 = 题干图片 + 按选项顺序的选项图片
pub fn build_question_message(question: &QuestionData) -> QuestionMessage {
    let question_text = question.question_text.trim();
    let mut content = if question_text.is_empty() {
        QUESTION_PLACEHOLDER.to_string()
    } else {
        question_text.to_string()
    };

    let choice_lines: Vec<String> = question
        .choices
        .iter()
        .map(|choice| format!("{}. {}", choice.label, choice.text).trim().to_string())
        .filter(|line| line != ".")
        .collect();
    if !choice_lines.is_empty() {
        content.push_str("\n\n");
        content.push_str(&choice_lines.join("\n"));
    }

    let image_urls = question
        .question_images
        .iter()
        .cloned()
        .chain(
            question
                .choices
                .iter()
                .flat_map(|choice| choice.images.iter().cloned()),
        )
        .collect();

    QuestionMessage { content, image_urls }
}

/// 构造投票载荷
///
/// 前 10 个选项成为答案，超过 55 字符的截断为 52 字符 + "..."
pub fn build_poll_spec(question: &QuestionData, config: &Config) -> PollSpec {
    let answers = question
        .choices
        .iter()
        .take(POLL_MAX_ANSWERS)
        .map(|choice| {
            let answer = format!("{}. {}", choice.label, choice.text).trim().to_string();
            truncate_poll_answer(&answer)
        })
        .collect();

    PollSpec {
        question: POLL_TITLE.to_string(),
        answers,
        duration_hours: config.poll_duration_hours,
        allow_multiselect: config.poll_allow_multiselect,
    }
}

/// 构造交互按钮
///
/// 每个选项一个按钮（上限 25 个），标识编码选项下标；
/// 有答案标记时追加"揭晓答案"按钮
pub fn build_choice_buttons(question: &QuestionData) -> Vec<ButtonSpec> {
    let mut buttons: Vec<ButtonSpec> = question
        .choices
        .iter()
        .take(MAX_BUTTONS)
        .enumerate()
        .map(|(index, choice)| {
            let full = format!("{}. {}", choice.label, choice.text).trim().to_string();
            let label = if full.chars().count() <= BUTTON_LABEL_MAX_CHARS {
                full
            } else {
                choice.label.clone()
            };
            ButtonSpec {
                custom_id: format!("{CHOICE_CUSTOM_ID_PREFIX}{index}"),
                label,
            }
        })
        .collect();

    if question.answer.is_some() {
        buttons.push(ButtonSpec {
            custom_id: REVEAL_CUSTOM_ID.to_string(),
            label: "答えを見る".to_string(),
        });
    }

    buttons
}

/// 截断超长的投票答案（按字符计数，CJK 安全）
fn truncate_poll_answer(answer: &str) -> String {
    if answer.chars().count() > POLL_ANSWER_MAX_CHARS {
        let truncated: String = answer.chars().take(POLL_ANSWER_TRUNCATED_CHARS).collect();
        format!("{truncated}...")
    } else {
        answer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChoiceData;

    fn question_with_choices(count: usize) -> QuestionData {
        QuestionData {
            question_text: "2^6 を計算した結果はどれか。".to_string(),
            question_images: vec!["https://example.com/q.png".to_string()],
            choices: (0..count)
                .map(|index| ChoiceData {
                    label: format!("選{index}"),
                    text: format!("選択肢{index}"),
                    images: vec![],
                })
                .collect(),
            answer: Some("選0".to_string()),
            explanation: None,
            explanation_images: vec![],
        }
    }

    #[test]
    fn test_message_contains_stem_and_choice_lines() {
        let message = build_question_message(&question_with_choices(2));
        assert_eq!(
            message.content,
            "2^6 を計算した結果はどれか。\n\n選0. 選択肢0\n選1. 選択肢1"
        );
    }

    #[test]
    fn test_empty_question_text_uses_placeholder() {
        let mut question = question_with_choices(0);
        question.question_text = "   ".to_string();
        let message = build_question_message(&question);
        assert_eq!(message.content, "Question");
    }

    #[test]
    fn test_degenerate_choice_lines_are_skipped() {
        let mut question = question_with_choices(1);
        question.choices.push(ChoiceData {
            label: String::new(),
            text: String::new(),
            images: vec![],
        });
        let message = build_question_message(&question);
        assert!(!message.content.contains("\n."));
        assert!(message.content.ends_with("選0. 選択肢0"));
    }

    #[test]
    fn test_image_urls_keep_question_then_choice_order() {
        let mut question = question_with_choices(2);
        question.choices[0].images = vec!["https://example.com/c0.png".to_string()];
        question.choices[1].images = vec!["https://example.com/c1.png".to_string()];
        let message = build_question_message(&question);
        assert_eq!(
            message.image_urls,
            vec![
                "https://example.com/q.png",
                "https://example.com/c0.png",
                "https://example.com/c1.png"
            ]
        );
    }

    #[test]
    fn test_zero_choices_produce_no_buttons() {
        let mut question = question_with_choices(0);
        question.answer = None;
        assert!(build_choice_buttons(&question).is_empty());
    }

    #[test]
    fn test_buttons_capped_at_25_in_original_order() {
        let question = question_with_choices(30);
        let buttons = build_choice_buttons(&question);
        // 25 个选项按钮 + 1 个揭晓答案按钮
        assert_eq!(buttons.len(), 26);
        for (index, button) in buttons.iter().take(25).enumerate() {
            assert_eq!(button.custom_id, format!("choice_{index}"));
            assert_eq!(button.label, format!("選{index}. 選択肢{index}"));
        }
        assert_eq!(buttons[25].custom_id, REVEAL_CUSTOM_ID);
        assert_eq!(buttons[25].label, "答えを見る");
    }

    #[test]
    fn test_no_reveal_button_without_answer() {
        let mut question = question_with_choices(3);
        question.answer = None;
        let buttons = build_choice_buttons(&question);
        assert_eq!(buttons.len(), 3);
        assert!(buttons.iter().all(|b| b.custom_id != REVEAL_CUSTOM_ID));
    }

    #[test]
    fn test_overlong_button_label_falls_back_to_label_only() {
        let mut question = question_with_choices(1);
        question.choices[0].text = "長".repeat(90);
        let buttons = build_choice_buttons(&question);
        assert_eq!(buttons[0].label, "選0");
    }

    #[test]
    fn test_poll_answers_capped_at_10() {
        let config = test_config();
        let poll = build_poll_spec(&question_with_choices(12), &config);
        assert_eq!(poll.answers.len(), 10);
        assert_eq!(poll.answers[0], "選0. 選択肢0");
        assert_eq!(poll.question, POLL_TITLE);
        assert_eq!(poll.duration_hours, 24);
        assert!(!poll.allow_multiselect);
    }

    #[test]
    fn test_poll_answer_count_matches_choices_when_under_cap() {
        let config = test_config();
        let poll = build_poll_spec(&question_with_choices(4), &config);
        assert_eq!(poll.answers.len(), 4);
    }

    #[test]
    fn test_overlong_poll_answers_truncated_with_ellipsis() {
        let config = test_config();
        let mut question = question_with_choices(1);
        question.choices[0].text = "あ".repeat(60);
        let poll = build_poll_spec(&question, &config);
        let answer = &poll.answers[0];
        assert_eq!(answer.chars().count(), 55);
        assert!(answer.ends_with("..."));
    }

    #[test]
    fn test_poll_answer_at_limit_not_truncated() {
        let config = test_config();
        let mut question = question_with_choices(1);
        // "選0. " 占 4 字符，补到恰好 55
        question.choices[0].text = "あ".repeat(51);
        let poll = build_poll_spec(&question, &config);
        assert_eq!(poll.answers[0].chars().count(), 55);
        assert!(!poll.answers[0].ends_with("..."));
    }

    fn test_config() -> Config {
        Config::from_toml(
            r#"
token = "t"
channel_id = 1
target_url = "https://example.com"
"#,
            "config.toml",
        )
        .unwrap()
    }
}
