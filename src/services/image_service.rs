//! 图片下载 - 业务能力层
//!
//! 按有界次数重试下载图片，把带透明通道的图片平铺到白底，
//! 再按平台的单条消息文件上限分批。

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::warn;
use url::Url;

use crate::config::Config;
use crate::error::{AppError, AppResult, FetchError};
use crate::utils::{retry, RetryOptions};

/// 单条消息最多附带的文件数
pub const MAX_FILES_PER_MESSAGE: usize = 10;

/// 待发送的附件
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// 图片下载服务
pub struct ImageService {
    http: reqwest::Client,
    retry_options: RetryOptions,
}

impl ImageService {
    /// 创建图片下载服务（配置了代理时所有请求走代理）
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|source| FetchError::ClientBuildFailed { source })?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|source| FetchError::ClientBuildFailed { source })?;

        Ok(Self {
            http,
            retry_options: RetryOptions {
                attempts: config.image_retry_attempts,
                delay: Duration::from_millis(config.image_retry_delay_ms),
            },
        })
    }

    /// 下载全部图片并转换为附件
    ///
    /// 并发下载，但按输入顺序收集结果：附件顺序和失败清单
    /// 都是确定性的，失败的 URL 全部收集完才统一报图片下载错误，
    /// 让编排层可以拿到完整的失败清单
    pub async fn fetch_attachments(&self, urls: &[String]) -> AppResult<Vec<Attachment>> {
        let downloads = urls.iter().map(|url| self.download(url));
        let results = futures::future::join_all(downloads).await;

        let mut attachments = Vec::new();
        let mut failed = Vec::new();
        for (index, (url, result)) in urls.iter().zip(results).enumerate() {
            match result {
                Ok(bytes) => attachments.push(Attachment {
                    file_name: attachment_file_name(url, index),
                    bytes: flatten_transparency(bytes),
                }),
                Err(err) => {
                    warn!("⚠️ 图片下载失败 ({url}): {err}");
                    failed.push(url.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(attachments)
        } else {
            Err(AppError::image_download(failed))
        }
    }

    /// 下载单张图片（带重试）
    async fn download(&self, url: &str) -> AppResult<Vec<u8>> {
        retry(self.retry_options, || async {
            let response = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|source| AppError::request_failed(url, source))?;

            let status = response.status();
            if !status.is_success() {
                return Err(AppError::bad_status(url, status.as_u16()));
            }

            let bytes = response.bytes().await.map_err(|source| {
                AppError::Fetch(FetchError::BodyReadFailed {
                    url: url.to_string(),
                    source,
                })
            })?;
            Ok(bytes.to_vec())
        })
        .await
    }
}

/// 把带透明通道的图片平铺到白底
///
/// 只处理支持透明的位图格式；解码 / 重编码失败时退回原始字节，
/// 图片处理失败不致命
pub fn flatten_transparency(bytes: Vec<u8>) -> Vec<u8> {
    match try_flatten(&bytes) {
        Some(flattened) => flattened,
        None => bytes,
    }
}

fn try_flatten(bytes: &[u8]) -> Option<Vec<u8>> {
    let format = image::guess_format(bytes).ok()?;
    if !matches!(format, ImageFormat::Png | ImageFormat::Gif | ImageFormat::WebP) {
        return None;
    }

    let decoded = image::load_from_memory_with_format(bytes, format).ok()?;
    let rgba = decoded.to_rgba8();
    if !rgba.pixels().any(|pixel| pixel[3] < u8::MAX) {
        // 完全不透明就保留原图
        return None;
    }

    let (width, height) = rgba.dimensions();
    let mut flattened = RgbImage::new(width, height);
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u16;
        let blend =
            |channel: u8| ((channel as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(flattened)
        .write_to(&mut out, ImageFormat::Png)
        .ok()?;
    Some(out.into_inner())
}

/// 从 URL 推导附件文件名
///
/// 取路径最后一个非空段；URL 不可解析或没有路径段时
/// 退回带序号的占位名
pub fn attachment_file_name(url: &str, index: usize) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(segments) = parsed.path_segments() {
            if let Some(name) = segments.filter(|segment| !segment.is_empty()).last() {
                return name.to_string();
            }
        }
    }
    format!("image-{}.bin", index + 1)
}
