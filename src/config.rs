use std::collections::HashMap;
use std::fs;

use serde::Deserialize;

use crate::api::kakomon::KakomonConfig;
use crate::error::{AppResult, ConfigError};

/// 程序配置文件
///
/// 从 TOML 文件一次性读入。`token` / `channel_id` / `target_url`
/// 为必填项（空值视为缺失），其余字段都有内置默认值。
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Discord Bot Token
    #[serde(default)]
    pub token: String,
    /// 发送目标频道 ID
    #[serde(default)]
    pub channel_id: u64,
    /// 目标URL（过去問検索端点）
    #[serde(default)]
    pub target_url: String,
    /// 出站代理地址（可选）
    #[serde(default)]
    pub proxy: Option<String>,
    /// 题干容器选择器
    #[serde(default = "default_question_selector")]
    pub question_selector: String,
    /// 选项容器选择器
    #[serde(default = "default_choice_selector")]
    pub choice_selector: String,
    /// 选项标识子选择器
    #[serde(default = "default_choice_label_selector")]
    pub choice_label_selector: Option<String>,
    /// 选项正文子选择器
    #[serde(default = "default_choice_text_selector")]
    pub choice_text_selector: Option<String>,
    /// 答案标记选择器
    #[serde(default = "default_answer_selector")]
    pub answer_selector: String,
    /// 解说容器选择器
    #[serde(default = "default_explanation_selector")]
    pub explanation_selector: String,
    /// 相对链接解析基准 URL（可选，默认用 target_url）
    #[serde(default)]
    pub base_url: Option<String>,
    /// 调度表达式（标准 5 段 cron）
    #[serde(default = "default_cron")]
    pub cron: String,
    /// 调度时区
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// 是否在问题消息之后追加投票
    #[serde(default)]
    pub poll_enabled: bool,
    /// 投票持续小时数
    #[serde(default = "default_poll_duration_hours")]
    pub poll_duration_hours: u32,
    /// 投票是否允许多选
    #[serde(default)]
    pub poll_allow_multiselect: bool,
    /// 单张图片下载尝试次数
    #[serde(default = "default_image_retry_attempts")]
    pub image_retry_attempts: u32,
    /// 图片下载重试间隔（毫秒）
    #[serde(default)]
    pub image_retry_delay_ms: u64,
    /// 原始请求覆盖项
    #[serde(default)]
    pub request: RequestOverrides,
    /// 过去問検索请求体配置
    #[serde(default)]
    pub kakomon: KakomonConfig,
}

/// 原始请求覆盖项
///
/// 合并在内置的表单请求之上，用于临时调整请求方式
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestOverrides {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_question_selector() -> String {
    "h3.qno + div".to_string()
}

fn default_choice_selector() -> String {
    "ul.selectList li".to_string()
}

fn default_choice_label_selector() -> Option<String> {
    Some("button.selectBtn".to_string())
}

fn default_choice_text_selector() -> Option<String> {
    Some("span".to_string())
}

fn default_answer_selector() -> String {
    "#answerChar".to_string()
}

fn default_explanation_selector() -> String {
    "#kaisetsu .ansbg".to_string()
}

fn default_cron() -> String {
    "0 5 * * *".to_string()
}

fn default_timezone() -> String {
    "Asia/Tokyo".to_string()
}

fn default_poll_duration_hours() -> u32 {
    24
}

fn default_image_retry_attempts() -> u32 {
    3
}

impl Config {
    /// 从 TOML 文件加载配置
    pub fn load(path: &str) -> AppResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&raw, path)
    }

    /// 从 TOML 文本解析配置并校验必填字段
    pub fn from_toml(raw: &str, path: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(raw).map_err(|source| ConfigError::ParseFailed {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验必填字段（空字符串 / 0 视为缺失）
    fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.token.is_empty() {
            missing.push("token".to_string());
        }
        if self.channel_id == 0 {
            missing.push("channel_id".to_string());
        }
        if self.target_url.is_empty() {
            missing.push("target_url".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields { fields: missing })
        }
    }

    /// 相对链接解析基准（未配置时退回 target_url）
    pub fn resolve_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.target_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const MINIMAL: &str = r#"
token = "bot-token"
channel_id = 123456789
target_url = "https://www.ap-siken.com/webapp/kakomon.php"
"#;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::from_toml(MINIMAL, "config.toml").unwrap();
        assert_eq!(config.question_selector, "h3.qno + div");
        assert_eq!(config.choice_selector, "ul.selectList li");
        assert_eq!(config.choice_label_selector.as_deref(), Some("button.selectBtn"));
        assert_eq!(config.choice_text_selector.as_deref(), Some("span"));
        assert_eq!(config.answer_selector, "#answerChar");
        assert_eq!(config.explanation_selector, "#kaisetsu .ansbg");
        assert_eq!(config.cron, "0 5 * * *");
        assert_eq!(config.timezone, "Asia/Tokyo");
        assert!(!config.poll_enabled);
        assert_eq!(config.poll_duration_hours, 24);
        assert!(!config.poll_allow_multiselect);
        assert_eq!(config.image_retry_attempts, 3);
        assert_eq!(config.image_retry_delay_ms, 0);
        assert!(config.kakomon.enabled);
    }

    #[test]
    fn test_missing_required_fields_are_all_reported() {
        let err = Config::from_toml("poll_enabled = true", "config.toml").unwrap_err();
        match err {
            AppError::Config(ConfigError::MissingFields { fields }) => {
                assert_eq!(fields, vec!["token", "channel_id", "target_url"]);
            }
            other => panic!("配置错误类型不对: {other}"),
        }
    }

    #[test]
    fn test_empty_string_counts_as_missing() {
        let raw = r#"
token = ""
channel_id = 1
target_url = "https://example.com"
"#;
        let err = Config::from_toml(raw, "config.toml").unwrap_err();
        match err {
            AppError::Config(ConfigError::MissingFields { fields }) => {
                assert_eq!(fields, vec!["token"]);
            }
            other => panic!("配置错误类型不对: {other}"),
        }
    }

    #[test]
    fn test_overrides_are_kept() {
        let raw = r#"
token = "t"
channel_id = 1
target_url = "https://example.com"
proxy = "http://127.0.0.1:8080"
cron = "30 21 * * *"
timezone = "UTC"
poll_enabled = true

[kakomon]
times = ["07_aki"]
qno = 5
"#;
        let config = Config::from_toml(raw, "config.toml").unwrap();
        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:8080"));
        assert_eq!(config.cron, "30 21 * * *");
        assert_eq!(config.timezone, "UTC");
        assert!(config.poll_enabled);
        assert_eq!(config.kakomon.times.as_deref(), Some(&["07_aki".to_string()][..]));
        assert_eq!(config.kakomon.qno, Some(5));
    }

    #[test]
    fn test_resolve_base_url_falls_back_to_target() {
        let config = Config::from_toml(MINIMAL, "config.toml").unwrap();
        assert_eq!(config.resolve_base_url(), "https://www.ap-siken.com/webapp/kakomon.php");
    }
}
