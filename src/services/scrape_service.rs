//! 抓取服务 - 业务能力层
//!
//! 组合检索客户端和题目提取，对流程层只暴露"拿一道题"能力

use async_trait::async_trait;
use tracing::debug;

use crate::clients::ExamClient;
use crate::config::Config;
use crate::error::AppResult;
use crate::models::QuestionData;
use crate::services::extractor::{parse_question_from_html, ExtractOptions};
use crate::workflow::QuestionScraper;

/// 抓取服务
pub struct ScrapeService {
    client: ExamClient,
    options: ExtractOptions,
}

impl ScrapeService {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            client: ExamClient::new(config)?,
            options: ExtractOptions::from_config(config),
        })
    }
}

#[async_trait]
impl QuestionScraper for ScrapeService {
    async fn scrape(&self) -> AppResult<QuestionData> {
        let html = self.client.fetch_html().await?;
        debug!("取得 HTML {} 字节", html.len());

        let question = parse_question_from_html(&html, &self.options);
        if let Ok(json) = serde_json::to_string(&question) {
            debug!("题目数据: {json}");
        }
        Ok(question)
    }
}
