//! 流程层（Workflow Layer）
//!
//! 定义"一次定时运行"的完整流程：抓取 → 格式化 → 发送，
//! 以及图片下载失败时的整周期重试。
//! 本层只依赖能力接口（`QuestionScraper` / `QuestionSender`），
//! 不持有任何资源，测试时注入替身。

pub mod quiz_flow;

pub use quiz_flow::{run_once, QuestionScraper, QuestionSender, RunOutcome};
