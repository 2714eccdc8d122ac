//! 过去問検索请求体构造
//!
//! 检索端点只接受表单编码的 POST，列表字段省略时退回内置目录，
//! 会话 ID 默认用当前时间的 SHA-256 摘要。

use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::form_urlencoded;

/// 内置的考期目录（新 → 旧）
const DEFAULT_TIMES: &[&str] = &[
    "07_aki", "07_haru", "06_aki", "06_haru", "05_aki", "05_haru", "04_aki", "04_haru", "03_aki",
    "03_haru", "02_aki", "01_aki", "31_haru", "30_aki", "30_haru", "29_aki", "29_haru", "28_aki",
    "28_haru", "27_aki", "27_haru", "26_aki", "26_haru", "25_aki", "25_haru", "24_aki", "24_haru",
    "23_aki", "23_toku", "22_aki", "22_haru", "21_aki", "21_haru", "20_aki",
];

/// 内置的分野目录
const DEFAULT_FIELDS: &[&str] = &["te_all", "ma_all", "st_all"];

/// 内置的出题分类（1〜23 全选）
const DEFAULT_CATEGORIES: &[u32] = &[
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23,
];

/// 内置的检索选项
const DEFAULT_OPTIONS: &[&str] = &["random", "showComment"];

/// 过去問検索配置
///
/// 所有字段可省略，省略时用内置目录 / 常量
#[derive(Debug, Clone, Deserialize)]
pub struct KakomonConfig {
    /// 是否启用表单 POST 流程
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 考期列表（如 "07_aki"）
    #[serde(default)]
    pub times: Option<Vec<String>>,
    /// 分野列表
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    /// 出题分类 ID 列表
    #[serde(default)]
    pub categories: Option<Vec<u32>>,
    /// 检索选项标志
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// 模試模式
    #[serde(default)]
    pub moshi: Option<String>,
    /// 模試题数
    #[serde(default)]
    pub moshi_cnt: Option<u32>,
    #[serde(default)]
    pub addition: Option<u32>,
    #[serde(default)]
    pub mode: Option<u32>,
    /// 题号
    #[serde(default)]
    pub qno: Option<u32>,
    /// 开始时间戳
    #[serde(default)]
    pub start_time: Option<String>,
}

impl Default for KakomonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            times: None,
            fields: None,
            categories: None,
            options: None,
            moshi: None,
            moshi_cnt: None,
            addition: None,
            mode: None,
            qno: None,
            start_time: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// 构造好的检索请求
#[derive(Debug, Clone)]
pub struct KakomonRequest {
    pub method: &'static str,
    pub content_type: &'static str,
    pub body: String,
}

/// 默认会话 ID：当前时间毫秒数的 SHA-256 十六进制摘要
fn default_sid() -> String {
    let now = chrono::Utc::now().timestamp_millis().to_string();
    hex::encode(Sha256::digest(now.as_bytes()))
}

/// 构造表单编码的检索请求体
///
/// # 参数
/// - `config`: 检索配置，列表字段省略时退回内置目录
/// - `sid_provider`: 会话 ID 生成器（测试时注入固定值）
pub fn build_kakomon_body(config: &KakomonConfig, sid_provider: impl Fn() -> String) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());

    match &config.times {
        Some(times) => {
            for time in times {
                params.append_pair("times[]", time);
            }
        }
        None => {
            for time in DEFAULT_TIMES {
                params.append_pair("times[]", time);
            }
        }
    }

    match &config.fields {
        Some(fields) => {
            for field in fields {
                params.append_pair("fields[]", field);
            }
        }
        None => {
            for field in DEFAULT_FIELDS {
                params.append_pair("fields[]", field);
            }
        }
    }

    match &config.categories {
        Some(categories) => {
            for category in categories {
                params.append_pair("categories[]", &category.to_string());
            }
        }
        None => {
            for category in DEFAULT_CATEGORIES {
                params.append_pair("categories[]", &category.to_string());
            }
        }
    }

    match &config.options {
        Some(options) => {
            for option in options {
                params.append_pair("options[]", option);
            }
        }
        None => {
            for option in DEFAULT_OPTIONS {
                params.append_pair("options[]", option);
            }
        }
    }

    params.append_pair("moshi", config.moshi.as_deref().unwrap_or("mix_all"));
    params.append_pair("moshi_cnt", &config.moshi_cnt.unwrap_or(40).to_string());
    params.append_pair("addition", &config.addition.unwrap_or(0).to_string());
    params.append_pair("mode", &config.mode.unwrap_or(1).to_string());
    params.append_pair("qno", &config.qno.unwrap_or(0).to_string());
    params.append_pair("sid", &sid_provider());
    params.append_pair("_q", "");
    params.append_pair("_r", "");
    params.append_pair("_c", "");
    params.append_pair("result", "-1");
    params.append_pair("startTime", config.start_time.as_deref().unwrap_or(""));

    params.finish()
}

/// 构造完整的检索请求（方法 + 内容类型 + 请求体）
pub fn build_kakomon_request(config: &KakomonConfig) -> KakomonRequest {
    KakomonRequest {
        method: "POST",
        content_type: "application/x-www-form-urlencoded",
        body: build_kakomon_body(config, default_sid),
    }
}
