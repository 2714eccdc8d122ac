use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 抓取相关错误
    #[error("抓取错误: {0}")]
    Fetch(#[from] FetchError),
    /// 图片下载错误
    #[error("图片下载错误: {0}")]
    ImageDownload(#[from] ImageDownloadError),
    /// Discord 发送错误
    #[error("发送错误: {0}")]
    Send(#[from] SendError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 抓取相关错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 网络请求失败
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 响应状态码不在成功范围内
    #[error("请求 {url} 返回非成功状态: {status}")]
    BadStatus { url: String, status: u16 },
    /// 读取响应体失败
    #[error("读取 {url} 响应体失败: {source}")]
    BodyReadFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// HTTP 客户端构建失败
    #[error("HTTP 客户端构建失败: {source}")]
    ClientBuildFailed {
        #[source]
        source: reqwest::Error,
    },
}

/// 图片下载错误
///
/// 携带全部下载失败的 URL，供编排层决定是否重跑整个抓取周期
#[derive(Debug, Error)]
#[error("图片下载失败 ({} 个): {}", .failed_urls.len(), .failed_urls.join(", "))]
pub struct ImageDownloadError {
    pub failed_urls: Vec<String>,
}

/// Discord 发送错误
#[derive(Debug, Error)]
pub enum SendError {
    /// Discord 客户端启动失败
    #[error("Discord 客户端启动失败: {source}")]
    ClientStartFailed {
        #[source]
        source: serenity::Error,
    },
    /// 网关在就绪前退出
    #[error("Discord 网关在就绪前退出")]
    GatewayNotReady,
    /// 目标频道不可用
    #[error("频道 {channel_id} 不是可发送的文字频道或不存在")]
    ChannelUnavailable { channel_id: u64 },
    /// Discord API 调用失败
    #[error("Discord API 调用失败 ({action}): {source}")]
    ApiFailed {
        action: &'static str,
        #[source]
        source: serenity::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必填字段
    #[error("缺少配置字段: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// cron 表达式非法
    #[error("cron 表达式非法 ({expression}): {reason}")]
    InvalidCron { expression: String, reason: String },
    /// 时区名非法
    #[error("时区名非法: {timezone}")]
    InvalidTimezone { timezone: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建请求失败错误
    pub fn request_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Fetch(FetchError::RequestFailed {
            url: url.into(),
            source,
        })
    }

    /// 创建非成功状态错误
    pub fn bad_status(url: impl Into<String>, status: u16) -> Self {
        AppError::Fetch(FetchError::BadStatus {
            url: url.into(),
            status,
        })
    }

    /// 创建图片下载错误
    pub fn image_download(failed_urls: Vec<String>) -> Self {
        AppError::ImageDownload(ImageDownloadError { failed_urls })
    }

    /// 创建 Discord API 调用错误
    pub fn send_api_failed(action: &'static str, source: serenity::Error) -> Self {
        AppError::Send(SendError::ApiFailed { action, source })
    }

    /// 是否为可在编排层重试的图片下载错误
    pub fn is_image_download(&self) -> bool {
        matches!(self, AppError::ImageDownload(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
