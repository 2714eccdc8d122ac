//! # Kakomon Quiz Bot
//!
//! 定时抓取過去問検索站点、把题目发到 Discord 并收集作答的机器人
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 接口层（Api）
//! - `api/` - 检索端点的表单请求体编码
//! - `kakomon` - 目录缺省值 + 会话 ID 生成
//!
//! ### ② 客户端层（Clients）
//! - `clients/` - 持有外部端点连接，只暴露能力
//! - `ExamClient` - 检索站点 HTTP 往返（代理 / 手动重定向）
//! - `DiscordSender` - serenity 网关封装（发送 / 交互事件分发）
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Question
//! - `extractor` - HTML → QuestionData 提取能力
//! - `formatter` - 消息 / 投票 / 按钮格式化能力
//! - `ImageService` - 图片下载 + 白底平铺 + 分批能力
//! - `InteractionTracker` - 作答状态跟踪能力
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一次运行"的完整流程
//! - `run_once` - 抓取 → 格式化 → 发送，图片失败时整周期重试
//!
//! 之上由 `scheduler` 按 cron 表达式触发，`app` 负责装配与停机。
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ChoiceData, QuestionData};
pub use workflow::{run_once, RunOutcome};
