//! 应用编排
//!
//! 负责启动顺序（跟踪器 → Discord 客户端 → 抓取服务 → 调度），
//! 把单次作业包装成"记日志 + 登记交互状态、错误不外传"的闭包，
//! 并处理 SIGINT / SIGTERM 的优雅停机。

use std::sync::Arc;

use tracing::{error, info};

use crate::clients::DiscordSender;
use crate::config::Config;
use crate::error::AppResult;
use crate::scheduler;
use crate::services::{InteractionTracker, ScrapeService};
use crate::workflow;

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    sender: Arc<DiscordSender>,
    tracker: Arc<InteractionTracker>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let tracker = Arc::new(InteractionTracker::new());
        let sender = Arc::new(DiscordSender::start(&config, tracker.clone()).await?);

        Ok(Self {
            config: Arc::new(config),
            sender,
            tracker,
        })
    }

    /// 运行应用主逻辑（阻塞到收到终止信号）
    pub async fn run(self) -> AppResult<()> {
        let scraper = Arc::new(ScrapeService::new(&self.config)?);

        let config = self.config.clone();
        let sender = self.sender.clone();
        let tracker = self.tracker.clone();
        let scheduler_task =
            scheduler::schedule_daily(&self.config.cron, &self.config.timezone, move || {
                run_job(
                    config.clone(),
                    scraper.clone(),
                    sender.clone(),
                    tracker.clone(),
                )
            })?;

        info!("✓ 已调度作业: {} ({})", self.config.cron, self.config.timezone);
        info!("🚀 Bot 运行中，Ctrl+C 停止");

        wait_for_shutdown_signal().await;

        info!("🛑 收到终止信号，开始优雅停机...");
        scheduler_task.abort();
        self.sender.stop().await;
        info!("✓ 已停止");
        Ok(())
    }
}

/// 单次定时作业
///
/// 错误只记录日志，一次失败绝不终止调度循环
async fn run_job(
    config: Arc<Config>,
    scraper: Arc<ScrapeService>,
    sender: Arc<DiscordSender>,
    tracker: Arc<InteractionTracker>,
) {
    info!("📦 作业开始");
    match workflow::run_once(&config, scraper.as_ref(), sender.as_ref()).await {
        Ok(outcome) => {
            tracker.register(outcome.message_id, outcome.question);
            info!(
                "✓ 作业完成 (消息 {}，累计跟踪 {} 条)",
                outcome.message_id,
                tracker.tracked_count()
            );
        }
        Err(err) => {
            error!("❌ 作业失败: {err}");
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(err) => {
            error!("注册 SIGTERM 处理失败: {err}");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 過去問 Discord Bot");
    info!("📡 目标站点: {}", config.target_url);
    info!("📣 发送频道: {}", config.channel_id);
    info!("{}", "=".repeat(60));
}
