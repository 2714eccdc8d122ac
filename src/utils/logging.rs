//! 日志工具模块
//!
//! 提供日志初始化和文本截断辅助函数

use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 默认级别 info，可通过 RUST_LOG 环境变量覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_short_text_unchanged() {
        assert_eq!(truncate_text("短いテキスト", 80), "短いテキスト");
    }

    #[test]
    fn test_truncate_text_counts_chars_not_bytes() {
        let text = "あ".repeat(10);
        let truncated = truncate_text(&text, 5);
        assert_eq!(truncated, format!("{}...", "あ".repeat(5)));
    }
}
