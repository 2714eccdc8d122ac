//! 定时调度
//!
//! 按 cron 表达式在指定时区触发作业。表达式用标准 5 段写法，
//! 内部补上秒段交给 cron crate 解析。
//! 作业在循环里被 await：上一次运行结束前不会计算下一个触发点，
//! 因此运行之间天然串行，不会重叠。

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{AppResult, ConfigError};

/// 解析调度表达式和时区（非法时报配置错误）
pub fn parse_schedule(expression: &str, timezone: &str) -> AppResult<(Schedule, Tz)> {
    let normalized = normalize_cron_expression(expression);
    let schedule = Schedule::from_str(&normalized).map_err(|err| ConfigError::InvalidCron {
        expression: expression.to_string(),
        reason: err.to_string(),
    })?;
    let tz = timezone
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone {
            timezone: timezone.to_string(),
        })?;
    Ok((schedule, tz))
}

/// 把标准 5 段 cron 表达式补成带秒段的 6 段形式
fn normalize_cron_expression(expression: &str) -> String {
    let fields = expression.split_whitespace().count();
    if fields == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    }
}

/// 按调度表达式循环触发作业
///
/// 返回调度任务的句柄；表达式 / 时区非法时在启动前报错
pub fn schedule_daily<F, Fut>(expression: &str, timezone: &str, job: F) -> AppResult<JoinHandle<()>>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let (schedule, tz) = parse_schedule(expression, timezone)?;

    Ok(tokio::spawn(async move {
        loop {
            let now = Utc::now().with_timezone(&tz);
            let Some(next) = schedule.after(&now).next() else {
                warn!("⚠️ 调度表达式没有下一次触发时间，调度结束");
                break;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!("下一次触发: {next} ({} 秒后)", wait.as_secs());
            tokio::time::sleep(wait).await;

            job().await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_five_field_expression_gets_seconds_column() {
        assert_eq!(normalize_cron_expression("0 5 * * *"), "0 0 5 * * *");
    }

    #[test]
    fn test_six_field_expression_unchanged() {
        assert_eq!(normalize_cron_expression("30 0 5 * * *"), "30 0 5 * * *");
    }

    #[test]
    fn test_next_occurrence_in_tokyo() {
        let (schedule, tz) = parse_schedule("0 5 * * *", "Asia/Tokyo").unwrap();
        let base = tz.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap();
        let next = schedule.after(&base).next().unwrap();
        // 正午之后的下一次触发是次日 05:00
        assert_eq!(next, tz.with_ymd_and_hms(2026, 8, 7, 5, 0, 0).unwrap());
    }

    #[test]
    fn test_invalid_expression_is_config_error() {
        let err = parse_schedule("not a cron", "Asia/Tokyo").unwrap_err();
        assert!(err.to_string().contains("cron"));
    }

    #[test]
    fn test_invalid_timezone_is_config_error() {
        let err = parse_schedule("0 5 * * *", "Mars/Olympus").unwrap_err();
        assert!(err.to_string().contains("Mars/Olympus"));
    }
}
