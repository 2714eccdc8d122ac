//! 通用重试辅助
//!
//! 对异步操作做有界次数的重试，默认不等待，可配置固定间隔

use std::future::Future;
use std::time::Duration;

/// 重试选项
#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    /// 总尝试次数（至少 1 次）
    pub attempts: u32,
    /// 两次尝试之间的等待时间
    pub delay: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

/// 按配置的次数重试异步操作
///
/// 最后一次失败的错误原样返回
pub async fn retry<T, E, F, Fut>(options: RetryOptions, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = options.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(_) if attempt < attempts => {
                if !options.delay.is_zero() {
                    tokio::time::sleep(options.delay).await;
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_succeeds_on_second_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(RetryOptions::default(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("一時的な失敗")
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_exhausts_attempts_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, u32> = retry(
            RetryOptions {
                attempts: 3,
                delay: Duration::ZERO,
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(n) }
            },
        )
        .await;

        assert_eq!(result, Err(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_clamps_zero_attempts_to_one() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = retry(
            RetryOptions {
                attempts: 0,
                delay: Duration::ZERO,
            },
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok(1) }
            },
        )
        .await;

        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
