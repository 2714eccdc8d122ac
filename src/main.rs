use anyhow::Result;
use kakomon_quiz_bot::{utils, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    utils::logging::init();

    // 加载配置（路径可由第一个参数指定）
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
