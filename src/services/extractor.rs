//! 题目提取 - 业务能力层
//!
//! 把原始 HTML 按选择器解析为结构化的 `QuestionData`。
//! 永远不报错：选择器不命中、HTML 残缺时产出空字段，
//! 缺失在数据模型里是合法状态而不是异常。

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::config::Config;
use crate::models::{ChoiceData, QuestionData};

/// 提取选项
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// 题干容器选择器
    pub question_selector: String,
    /// 选项容器选择器
    pub choice_selector: String,
    /// 选项标识子选择器（缺省时结构回退到 button）
    pub choice_label_selector: Option<String>,
    /// 选项正文子选择器（缺省时结构回退到 span）
    pub choice_text_selector: Option<String>,
    /// 答案标记选择器
    pub answer_selector: String,
    /// 解说容器选择器
    pub explanation_selector: String,
    /// 相对链接解析基准
    pub base_url: Option<String>,
}

impl ExtractOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            question_selector: config.question_selector.clone(),
            choice_selector: config.choice_selector.clone(),
            choice_label_selector: config.choice_label_selector.clone(),
            choice_text_selector: config.choice_text_selector.clone(),
            answer_selector: config.answer_selector.clone(),
            explanation_selector: config.explanation_selector.clone(),
            base_url: Some(config.resolve_base_url().to_string()),
        }
    }
}

/// 把原始 HTML 解析为结构化题目
pub fn parse_question_from_html(html: &str, options: &ExtractOptions) -> QuestionData {
    let document = Html::parse_document(html);
    let base_url = options.base_url.as_deref();

    let question_element = select_first(&document, &options.question_selector);
    let question_text = question_element.map(extract_text).unwrap_or_default();
    let question_images = question_element
        .map(|element| extract_images(element, base_url))
        .unwrap_or_default();

    let choices = match Selector::parse(&options.choice_selector) {
        Ok(selector) => document
            .select(&selector)
            .map(|element| extract_choice(element, options, base_url))
            .collect(),
        Err(_) => Vec::new(),
    };

    let answer = select_first(&document, &options.answer_selector)
        .map(extract_text)
        .filter(|text| !text.is_empty());

    let explanation_element = select_first(&document, &options.explanation_selector);
    let explanation = explanation_element
        .map(extract_text)
        .filter(|text| !text.is_empty());
    let explanation_images = explanation_element
        .map(|element| extract_images(element, base_url))
        .unwrap_or_default();

    QuestionData {
        question_text,
        question_images,
        choices,
        answer,
        explanation,
        explanation_images,
    }
}

/// 文档内第一个命中选择器的元素（选择器非法时视为不命中）
fn select_first<'a>(document: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let parsed = Selector::parse(selector).ok()?;
    document.select(&parsed).next()
}

/// 元素范围内第一个命中选择器的子元素
fn select_first_in<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let parsed = Selector::parse(selector).ok()?;
    scope.select(&parsed).next()
}

/// 提取单个选项
///
/// 标识 / 正文的子选择器缺省时回退到页面结构（button / span）
fn extract_choice(
    element: ElementRef<'_>,
    options: &ExtractOptions,
    base_url: Option<&str>,
) -> ChoiceData {
    let label_selector = options.choice_label_selector.as_deref().unwrap_or("button");
    let text_selector = options.choice_text_selector.as_deref().unwrap_or("span");

    let label = select_first_in(element, label_selector)
        .map(extract_text)
        .unwrap_or_default();
    let text = select_first_in(element, text_selector)
        .map(extract_text)
        .unwrap_or_default();
    let images = extract_images(element, base_url);

    ChoiceData { label, text, images }
}

/// 提取元素的可见文本
///
/// `<sup>` 的内容改写为 `^` 前缀的内联标记（指数不被静默丢掉），
/// 然后把空白串折叠成单个空格并去掉首尾空白
fn extract_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    if let Ok(whitespace) = Regex::new(r"\s+") {
        whitespace.replace_all(&raw, " ").trim().to_string()
    } else {
        raw.trim().to_string()
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if child_element.value().name() == "sup" {
                        out.push('^');
                    }
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// 提取元素内全部图片引用（文档顺序）
fn extract_images(element: ElementRef<'_>, base_url: Option<&str>) -> Vec<String> {
    let Ok(selector) = Selector::parse("img") else {
        return Vec::new();
    };

    element
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(|src| resolve_url(src, base_url))
        .collect()
}

/// 把相对链接解析到基准 URL 上
///
/// 无法解析的 URL 原样透传而不是丢弃
fn resolve_url(raw: &str, base_url: Option<&str>) -> String {
    let Some(base) = base_url else {
        return raw.to_string();
    };
    match Url::parse(base).and_then(|base| base.join(raw)) {
        Ok(resolved) => resolved.to_string(),
        Err(_) => raw.to_string(),
    }
}
