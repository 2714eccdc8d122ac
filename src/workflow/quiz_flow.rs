//! 单次运行流程 - 流程层
//!
//! 流程顺序：
//! 1. 抓取题目（检索端点每次返回新题）
//! 2. 格式化为消息 + 按钮（无选项时只发纯文本）
//! 3. 发送，启用投票时再追加投票
//!
//! 图片下载失败属于可重试失败：丢弃本次所有中间结果、
//! 从抓取重新来一遍（是全新尝试而不是重放），只重试一次。
//! 其他任何失败原样向上传播。

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{ButtonSpec, PollSpec, QuestionData, QuestionMessage};
use crate::services::formatter;

/// 题目抓取能力
#[async_trait]
pub trait QuestionScraper: Send + Sync {
    async fn scrape(&self) -> AppResult<QuestionData>;
}

/// 消息发送能力
#[async_trait]
pub trait QuestionSender: Send + Sync {
    /// 发送问题消息（含附件 / 交互按钮），返回平台分配的消息 ID
    async fn send_question(
        &self,
        message: &QuestionMessage,
        controls: &[ButtonSpec],
    ) -> AppResult<u64>;

    /// 发送投票
    async fn send_poll(&self, poll: &PollSpec) -> AppResult<()>;
}

/// 单次运行结果
///
/// 消息 ID 和题目数据成对返回，调用方据此登记交互状态
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub message_id: u64,
    pub question: QuestionData,
}

/// 最多尝试次数
const MAX_ATTEMPTS: u32 = 2;

/// 执行一次完整的抓取发送周期
pub async fn run_once(
    config: &Config,
    scraper: &dyn QuestionScraper,
    sender: &dyn QuestionSender,
) -> AppResult<RunOutcome> {
    let mut attempt = 1;
    loop {
        match attempt_once(config, scraper, sender).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) if err.is_image_download() && attempt < MAX_ATTEMPTS => {
                warn!("⚠️ 第 {attempt} 次尝试图片下载失败，重新抓取: {err}");
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// 单次尝试：抓取 → 格式化 → 发送
async fn attempt_once(
    config: &Config,
    scraper: &dyn QuestionScraper,
    sender: &dyn QuestionSender,
) -> AppResult<RunOutcome> {
    let question = scraper.scrape().await?;
    info!(
        "📝 取得题目: {} (选项 {} 个)",
        question.preview(),
        question.choices.len()
    );

    let message = formatter::build_question_message(&question);
    let controls = if question.has_choices() {
        formatter::build_choice_buttons(&question)
    } else {
        Vec::new()
    };

    let message_id = sender.send_question(&message, &controls).await?;

    if config.poll_enabled {
        let poll = formatter::build_poll_spec(&question, config);
        sender.send_poll(&poll).await?;
    }

    Ok(RunOutcome { message_id, question })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::ChoiceData;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    fn question(stem: &str) -> QuestionData {
        QuestionData {
            question_text: stem.to_string(),
            question_images: vec![],
            choices: vec![ChoiceData {
                label: "ア".to_string(),
                text: "選択肢".to_string(),
                images: vec![],
            }],
            answer: Some("ア".to_string()),
            explanation: None,
            explanation_images: vec![],
        }
    }

    fn config(poll_enabled: bool) -> Config {
        let raw = format!(
            r#"
token = "t"
channel_id = 1
target_url = "https://example.com"
poll_enabled = {poll_enabled}
"#
        );
        Config::from_toml(&raw, "config.toml").unwrap()
    }

    /// 按顺序吐出预置题目的抓取替身
    struct SequenceScraper {
        questions: Mutex<VecDeque<QuestionData>>,
        calls: AtomicU32,
    }

    impl SequenceScraper {
        fn new(questions: Vec<QuestionData>) -> Self {
            Self {
                questions: Mutex::new(questions.into()),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl QuestionScraper for SequenceScraper {
        async fn scrape(&self) -> AppResult<QuestionData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.questions.lock().unwrap().pop_front();
            next.ok_or_else(|| AppError::Other("预置题目用完了".to_string()))
        }
    }

    /// 前 N 次发送报图片下载失败的发送替身
    struct FlakySender {
        failures_left: AtomicU32,
        send_calls: AtomicU32,
        poll_calls: AtomicU32,
        last_controls: Mutex<Vec<ButtonSpec>>,
    }

    impl FlakySender {
        fn failing(times: u32) -> Self {
            Self {
                failures_left: AtomicU32::new(times),
                send_calls: AtomicU32::new(0),
                poll_calls: AtomicU32::new(0),
                last_controls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuestionSender for FlakySender {
        async fn send_question(
            &self,
            _message: &QuestionMessage,
            controls: &[ButtonSpec],
        ) -> AppResult<u64> {
            self.send_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_controls.lock().unwrap() = controls.to_vec();

            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(AppError::image_download(vec![
                    "https://example.com/q.png".to_string(),
                ]));
            }
            Ok(42)
        }

        async fn send_poll(&self, _poll: &PollSpec) -> AppResult<()> {
            self.poll_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_image_failure_triggers_one_full_rescrape() {
        let scraper = SequenceScraper::new(vec![question("Q_A"), question("Q_B")]);
        let sender = FlakySender::failing(1);

        let outcome = run_once(&config(false), &scraper, &sender).await.unwrap();

        // 整个周期重来：抓取两次、发送两次，最终关联的是第二道题
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sender.send_calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.message_id, 42);
        assert_eq!(outcome.question.question_text, "Q_B");
    }

    #[tokio::test]
    async fn test_second_image_failure_propagates() {
        let scraper = SequenceScraper::new(vec![question("Q_A"), question("Q_B")]);
        let sender = FlakySender::failing(2);

        let err = run_once(&config(false), &scraper, &sender).await.unwrap_err();
        assert!(err.is_image_download());
        assert_eq!(scraper.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sender.send_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        struct FailingScraper;

        #[async_trait]
        impl QuestionScraper for FailingScraper {
            async fn scrape(&self) -> AppResult<QuestionData> {
                Err(AppError::bad_status("https://example.com", 503))
            }
        }

        let sender = FlakySender::failing(0);
        let err = run_once(&config(false), &FailingScraper, &sender)
            .await
            .unwrap_err();
        assert!(!err.is_image_download());
        assert_eq!(sender.send_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_choices_send_without_controls() {
        let mut no_choices = question("選択肢なし");
        no_choices.choices.clear();
        no_choices.answer = None;
        let scraper = SequenceScraper::new(vec![no_choices]);
        let sender = FlakySender::failing(0);

        run_once(&config(false), &scraper, &sender).await.unwrap();
        assert!(sender.last_controls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_poll_sent_only_when_enabled() {
        let scraper = SequenceScraper::new(vec![question("Q_A"), question("Q_B")]);
        let sender = FlakySender::failing(0);

        run_once(&config(true), &scraper, &sender).await.unwrap();
        assert_eq!(sender.poll_calls.load(Ordering::SeqCst), 1);

        let sender = FlakySender::failing(0);
        run_once(&config(false), &scraper, &sender).await.unwrap();
        assert_eq!(sender.poll_calls.load(Ordering::SeqCst), 0);
    }
}
