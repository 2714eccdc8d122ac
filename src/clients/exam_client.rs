//! 过去問検索站点客户端
//!
//! 封装对检索端点的一次 HTTP 往返：表单 POST（禁用自动重定向）、
//! 手动跟随一次重定向并携带 Cookie、可选的出站代理。
//! 站点在表单提交后通过服务端重定向返回真正的题目页面，
//! 所以第一跳必须手动处理。

use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, REFERER, SET_COOKIE};
use reqwest::Method;
use tracing::debug;
use url::Url;

use crate::api::kakomon::{build_kakomon_request, KakomonConfig};
use crate::config::{Config, RequestOverrides};
use crate::error::{AppError, AppResult, FetchError};

/// 检索站点客户端
pub struct ExamClient {
    /// 禁用重定向的客户端（首个表单 POST 用）
    primary: reqwest::Client,
    /// 跟随重定向的客户端（重定向后的 GET 用）
    follower: reqwest::Client,
    target_url: String,
    kakomon: KakomonConfig,
    overrides: RequestOverrides,
}

impl ExamClient {
    /// 创建客户端（配置了代理时两个客户端的所有请求都走代理）
    pub fn new(config: &Config) -> AppResult<Self> {
        let primary = client_builder(config.proxy.as_deref())?
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|source| FetchError::ClientBuildFailed { source })?;
        let follower = client_builder(config.proxy.as_deref())?
            .build()
            .map_err(|source| FetchError::ClientBuildFailed { source })?;

        Ok(Self {
            primary,
            follower,
            target_url: config.target_url.clone(),
            kakomon: config.kakomon.clone(),
            overrides: config.request.clone(),
        })
    }

    /// 抓取题目页面 HTML
    ///
    /// 表单流程启用时：POST 检索请求体（带 Referer），若返回 3xx 且带
    /// Location，则解析重定向地址、把 Set-Cookie 作为 Cookie 带上，
    /// 再 GET 一次并返回其响应体；否则直接返回首个响应体。
    /// 最终响应状态不在成功范围内时报抓取错误（含 URL 和状态码）。
    pub async fn fetch_html(&self) -> AppResult<String> {
        let response = self.send_primary_request().await?;
        let status = response.status();

        if self.kakomon.enabled && status.is_redirection() {
            if let Some(location) = header_value(response.headers(), LOCATION.as_str()) {
                let resolved = resolve_location(&self.target_url, &location);
                let cookie = header_value(response.headers(), SET_COOKIE.as_str());
                debug!("跟随重定向: {resolved}");
                return self.follow_redirect(&resolved, cookie).await;
            }
        }

        if !status.is_success() {
            return Err(AppError::bad_status(&self.target_url, status.as_u16()));
        }
        read_body(response, &self.target_url).await
    }

    /// 发出首个请求（表单 POST 或普通 GET，覆盖项合并在上面）
    async fn send_primary_request(&self) -> AppResult<reqwest::Response> {
        let kakomon_request = self
            .kakomon
            .enabled
            .then(|| build_kakomon_request(&self.kakomon));

        let method_name = self
            .overrides
            .method
            .clone()
            .or_else(|| kakomon_request.as_ref().map(|request| request.method.to_string()))
            .unwrap_or_else(|| "GET".to_string());
        let method = Method::from_bytes(method_name.as_bytes()).unwrap_or(Method::GET);

        let mut request = self.primary.request(method, &self.target_url);
        if let Some(kakomon_request) = &kakomon_request {
            request = request
                .header(CONTENT_TYPE, kakomon_request.content_type)
                .header(REFERER, &self.target_url);
        }
        for (name, value) in &self.overrides.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let body = self
            .overrides
            .body
            .clone()
            .or(kakomon_request.map(|request| request.body));
        if let Some(body) = body {
            request = request.body(body);
        }

        request
            .send()
            .await
            .map_err(|source| AppError::request_failed(&self.target_url, source))
    }

    /// 跟随一次重定向（带 Cookie 的 GET，自动重定向开启）
    async fn follow_redirect(&self, url: &str, cookie: Option<String>) -> AppResult<String> {
        let mut request = self.follower.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|source| AppError::request_failed(url, source))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::bad_status(url, status.as_u16()));
        }
        read_body(response, url).await
    }
}

fn client_builder(proxy: Option<&str>) -> AppResult<reqwest::ClientBuilder> {
    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = proxy {
        let proxy =
            reqwest::Proxy::all(proxy).map_err(|source| FetchError::ClientBuildFailed { source })?;
        builder = builder.proxy(proxy);
    }
    Ok(builder)
}

fn header_value(headers: &reqwest::header::HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

/// 把 Location 头解析到目标 URL 上（绝对地址原样保留）
fn resolve_location(target_url: &str, location: &str) -> String {
    match Url::parse(target_url).and_then(|base| base.join(location)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => location.to_string(),
    }
}

async fn read_body(response: reqwest::Response, url: &str) -> AppResult<String> {
    response.text().await.map_err(|source| {
        AppError::Fetch(FetchError::BodyReadFailed {
            url: url.to_string(),
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_location_resolved_against_target() {
        assert_eq!(
            resolve_location(
                "https://www.ap-siken.com/webapp/kakomon.php",
                "./kakomon_result.php?sid=abc"
            ),
            "https://www.ap-siken.com/webapp/kakomon_result.php?sid=abc"
        );
    }

    #[test]
    fn test_absolute_location_kept_as_is() {
        assert_eq!(
            resolve_location(
                "https://www.ap-siken.com/webapp/kakomon.php",
                "https://other.example.com/page"
            ),
            "https://other.example.com/page"
        );
    }

    #[test]
    fn test_unparsable_target_passes_location_through() {
        assert_eq!(resolve_location("not a url", "/page"), "/page");
    }
}
