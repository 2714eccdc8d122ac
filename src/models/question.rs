use serde::{Deserialize, Serialize};

use crate::utils::truncate_text;

/// 单个选项
///
/// `label` 是选项标识（如 "ア"），`text` 是选项正文。
/// 选项顺序在所有转换中都必须保持不变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceData {
    pub label: String,
    pub text: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// 一道题目的结构化数据
///
/// 每次抓取产生一份，创建后不再修改；发送成功后按消息 ID
/// 移交给交互状态跟踪器。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionData {
    pub question_text: String,
    #[serde(default)]
    pub question_images: Vec<String>,
    #[serde(default)]
    pub choices: Vec<ChoiceData>,
    /// 正解选项的标识（如 "ウ"），页面上没有答案标记时为空
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub explanation_images: Vec<String>,
}

impl QuestionData {
    /// 是否至少有一个选项
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }

    /// 题干预览（用于日志显示）
    pub fn preview(&self) -> String {
        truncate_text(&self.question_text, 80)
    }
}

/// 格式化后的问题消息（仅在一次运行内存在）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMessage {
    pub content: String,
    pub image_urls: Vec<String>,
}

/// 投票载荷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSpec {
    pub question: String,
    /// 最多 10 个答案，每个不超过 55 字符
    pub answers: Vec<String>,
    pub duration_hours: u32,
    pub allow_multiselect: bool,
}

/// 交互按钮描述
///
/// `custom_id` 编码选项下标（`choice_{index}`）或固定的 `answer`，
/// 由 Discord 客户端转换为实际按钮。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    pub custom_id: String,
    pub label: String,
}
