//! 交互状态跟踪 - 业务能力层
//!
//! 按消息 ID 记录谁已作答、谁最先答对，并为每次按钮事件
//! 产出纯数据的处理结果（回复文本 + 可选的原消息追加行），
//! 实际的 Discord 调用由客户端层完成。
//!
//! 状态以消息为粒度互斥更新，同一条消息上并发的"答对"事件
//! 只会产生一个最速正解者。状态随消息数量无限增长，
//! 进程生命周期内不回收（已知限制）。

use std::collections::HashSet;

use dashmap::DashMap;

use crate::models::QuestionData;

/// 一次交互的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionOutcome {
    /// 只对请求用户可见的回复文本
    pub reply: String,
    /// 需要追加到原问题消息的"最速正解者"行
    pub credit_line: Option<String>,
}

impl InteractionOutcome {
    fn reply_only(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            credit_line: None,
        }
    }
}

/// 单条消息的交互状态
struct MessageState {
    question: QuestionData,
    answered_user_ids: HashSet<u64>,
    first_correct_answerer: Option<u64>,
}

/// 交互状态跟踪器
pub struct InteractionTracker {
    states: DashMap<u64, MessageState>,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// 发送成功后登记题目数据，键为平台分配的消息 ID
    pub fn register(&self, message_id: u64, question: QuestionData) {
        self.states.insert(
            message_id,
            MessageState {
                question,
                answered_user_ids: HashSet::new(),
                first_correct_answerer: None,
            },
        );
    }

    /// 已登记的消息数（用于日志）
    pub fn tracked_count(&self) -> usize {
        self.states.len()
    }

    /// 处理选项按钮事件
    ///
    /// 未登记的消息、重复作答、非法下标都返回拒绝回复；
    /// 否则记录作答并产出包含选择、正误、解说的私密回复。
    /// 首位答对者同时产出追加到原消息的最速正解行。
    pub fn handle_choice(
        &self,
        message_id: u64,
        user_id: u64,
        choice_index: usize,
    ) -> InteractionOutcome {
        let Some(mut entry) = self.states.get_mut(&message_id) else {
            return InteractionOutcome::reply_only("問題データが見つかりません。");
        };
        let state = entry.value_mut();

        if state.answered_user_ids.contains(&user_id) {
            return InteractionOutcome::reply_only(
                "既に回答済みです。「答えを見る」ボタンをご利用ください。",
            );
        }

        let Some(choice) = state.question.choices.get(choice_index) else {
            return InteractionOutcome::reply_only("無効な選択肢です。");
        };
        let choice_label = choice.label.clone();
        let choice_text = choice.text.clone();

        state.answered_user_ids.insert(user_id);

        let answer = state.question.answer.clone();
        let is_correct = answer.as_deref() == Some(choice_label.as_str());

        let mut reply = format!("選択した答え: **{choice_label}. {choice_text}**\n\n");
        if let Some(answer) = &answer {
            reply.push_str(&format!("正解: **{answer}**\n"));
            reply.push_str(if is_correct { "✅ 正解！" } else { "❌ 不正解" });
        }
        if let Some(explanation) = &state.question.explanation {
            reply.push_str(&format!("\n\n**解説:**\n{explanation}"));
        }

        let mut credit_line = None;
        if is_correct && state.first_correct_answerer.is_none() {
            state.first_correct_answerer = Some(user_id);
            credit_line = Some(format!("最速正解者: <@{user_id}>"));
        }

        InteractionOutcome { reply, credit_line }
    }

    /// 处理"揭晓答案"按钮事件
    ///
    /// 标记该用户已作答（重复调用幂等），私密回复答案和解说
    pub fn handle_reveal(&self, message_id: u64, user_id: u64) -> InteractionOutcome {
        let Some(mut entry) = self.states.get_mut(&message_id) else {
            return InteractionOutcome::reply_only("答えが利用できません。");
        };
        let state = entry.value_mut();

        let Some(answer) = state.question.answer.clone() else {
            return InteractionOutcome::reply_only("答えが利用できません。");
        };

        state.answered_user_ids.insert(user_id);

        let mut reply = format!("**答え:** {answer}");
        if let Some(explanation) = &state.question.explanation {
            reply.push_str(&format!("\n\n**解説:**\n{explanation}"));
        }

        InteractionOutcome::reply_only(reply)
    }
}

impl Default for InteractionTracker {
    fn default() -> Self {
        Self::new()
    }
}
