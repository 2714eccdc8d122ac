//! Discord 客户端
//!
//! 封装 serenity 网关客户端，对外提供发送能力
//! （文本 / 附件 / 按钮 / 投票）和按钮事件的分发。
//! 按钮事件先交给交互跟踪器做纯状态决策，
//! 再由这里执行实际的 Discord 调用（私密回复、原消息编辑）。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serenity::all::{
    ButtonStyle, ChannelId, ChannelType, Context, CreateActionRow, CreateAttachment, CreateButton,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateMessage, CreatePoll,
    CreatePollAnswer, EditMessage, EventHandler, GatewayIntents, Interaction, Ready,
};
use serenity::gateway::ShardManager;
use serenity::http::Http;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, SendError};
use crate::models::{ButtonSpec, PollSpec, QuestionMessage};
use crate::services::formatter::{CHOICE_CUSTOM_ID_PREFIX, REVEAL_CUSTOM_ID};
use crate::services::image_service::MAX_FILES_PER_MESSAGE;
use crate::services::{ImageService, InteractionTracker};
use crate::workflow::QuestionSender;

/// 一个操作行最多容纳的按钮数
const BUTTONS_PER_ROW: usize = 5;

/// Discord 发送客户端
pub struct DiscordSender {
    http: Arc<Http>,
    channel_id: ChannelId,
    shard_manager: Arc<ShardManager>,
    images: ImageService,
    gateway_task: Mutex<Option<JoinHandle<()>>>,
}

impl DiscordSender {
    /// 启动网关客户端，等待就绪并校验目标频道
    pub async fn start(config: &Config, tracker: Arc<InteractionTracker>) -> AppResult<Self> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let handler = InteractionHandler {
            tracker,
            ready_tx: std::sync::Mutex::new(Some(ready_tx)),
        };

        let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES;
        let mut client = serenity::Client::builder(&config.token, intents)
            .event_handler(handler)
            .await
            .map_err(|source| SendError::ClientStartFailed { source })?;

        let http = client.http.clone();
        let shard_manager = client.shard_manager.clone();
        let gateway_task = tokio::spawn(async move {
            if let Err(err) = client.start().await {
                error!("❌ Discord 网关异常退出: {err}");
            }
        });

        if ready_rx.await.is_err() {
            return Err(AppError::Send(SendError::GatewayNotReady));
        }

        let sender = Self {
            http,
            channel_id: ChannelId::new(config.channel_id),
            shard_manager,
            images: ImageService::new(config)?,
            gateway_task: Mutex::new(Some(gateway_task)),
        };
        sender.ensure_channel_access().await?;
        Ok(sender)
    }

    /// 校验目标频道存在且是可发送的文字频道
    async fn ensure_channel_access(&self) -> AppResult<()> {
        let unavailable = || {
            AppError::Send(SendError::ChannelUnavailable {
                channel_id: self.channel_id.get(),
            })
        };

        let channel = self
            .http
            .get_channel(self.channel_id)
            .await
            .map_err(|_| unavailable())?;
        match channel.guild() {
            Some(guild_channel)
                if matches!(guild_channel.kind, ChannelType::Text | ChannelType::News) =>
            {
                info!("✓ 目标频道可用: #{}", guild_channel.name);
                Ok(())
            }
            _ => Err(unavailable()),
        }
    }

    /// 发送纯文本消息，返回消息 ID
    pub async fn send_text(&self, content: &str) -> AppResult<u64> {
        let sent = self
            .channel_id
            .send_message(&self.http, CreateMessage::new().content(content))
            .await
            .map_err(|source| AppError::send_api_failed("send_text", source))?;
        Ok(sent.id.get())
    }

    /// 优雅停止网关
    pub async fn stop(&self) {
        self.shard_manager.shutdown_all().await;
        if let Some(task) = self.gateway_task.lock().await.take() {
            let _ = task.await;
        }
    }
}

#[async_trait]
impl QuestionSender for DiscordSender {
    /// 发送问题消息
    ///
    /// 无图片时单条发送；有图片时先全部下载（失败聚合成
    /// 图片下载错误向上抛），再按单条消息文件上限分批发送。
    /// 正文和按钮只挂在第一批上，返回第一批的消息 ID。
    async fn send_question(
        &self,
        message: &QuestionMessage,
        controls: &[ButtonSpec],
    ) -> AppResult<u64> {
        let rows = button_rows(controls);

        if message.image_urls.is_empty() {
            if rows.is_empty() {
                return self.send_text(&message.content).await;
            }
            let builder = CreateMessage::new()
                .content(message.content.as_str())
                .components(rows);
            let sent = self
                .channel_id
                .send_message(&self.http, builder)
                .await
                .map_err(|source| AppError::send_api_failed("send_with_controls", source))?;
            return Ok(sent.id.get());
        }

        let attachments = self.images.fetch_attachments(&message.image_urls).await?;

        let mut first_id = None;
        for (batch_index, batch) in attachments.chunks(MAX_FILES_PER_MESSAGE).enumerate() {
            let files: Vec<CreateAttachment> = batch
                .iter()
                .map(|attachment| {
                    CreateAttachment::bytes(attachment.bytes.clone(), attachment.file_name.clone())
                })
                .collect();

            let mut builder = CreateMessage::new().add_files(files);
            if batch_index == 0 {
                builder = builder.content(message.content.as_str());
                if !rows.is_empty() {
                    builder = builder.components(rows.clone());
                }
            }

            let sent = self
                .channel_id
                .send_message(&self.http, builder)
                .await
                .map_err(|source| AppError::send_api_failed("send_with_attachments", source))?;
            if batch_index == 0 {
                first_id = Some(sent.id.get());
            }
        }

        first_id.ok_or_else(|| AppError::Other("附件批次为空".to_string()))
    }

    /// 发送投票
    async fn send_poll(&self, poll: &PollSpec) -> AppResult<()> {
        let answers: Vec<CreatePollAnswer> = poll
            .answers
            .iter()
            .map(|text| CreatePollAnswer::new().text(text.clone()))
            .collect();

        let mut create_poll = CreatePoll::new()
            .question(poll.question.clone())
            .answers(answers)
            .duration(Duration::from_secs(u64::from(poll.duration_hours) * 3600));
        if poll.allow_multiselect {
            create_poll = create_poll.allow_multiselect();
        }

        self.channel_id
            .send_message(&self.http, CreateMessage::new().poll(create_poll))
            .await
            .map_err(|source| AppError::send_api_failed("send_poll", source))?;
        Ok(())
    }
}

/// 把按钮描述按每行上限排进操作行
fn button_rows(controls: &[ButtonSpec]) -> Vec<CreateActionRow> {
    controls
        .chunks(BUTTONS_PER_ROW)
        .map(|chunk| {
            let buttons = chunk
                .iter()
                .map(|spec| {
                    let style = if spec.custom_id == REVEAL_CUSTOM_ID {
                        ButtonStyle::Secondary
                    } else {
                        ButtonStyle::Primary
                    };
                    CreateButton::new(spec.custom_id.clone())
                        .label(spec.label.clone())
                        .style(style)
                })
                .collect();
            CreateActionRow::Buttons(buttons)
        })
        .collect()
}

/// 网关事件处理器
struct InteractionHandler {
    tracker: Arc<InteractionTracker>,
    ready_tx: std::sync::Mutex<Option<oneshot::Sender<()>>>,
}

#[serenity::async_trait]
impl EventHandler for InteractionHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("✓ Discord 已就绪: {}", ready.user.name);
        let ready_tx = self.ready_tx.lock().ok().and_then(|mut guard| guard.take());
        if let Some(ready_tx) = ready_tx {
            let _ = ready_tx.send(());
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };

        let custom_id = component.data.custom_id.clone();
        let message_id = component.message.id.get();
        let user_id = component.user.id.get();

        let outcome = if let Some(index) = custom_id
            .strip_prefix(CHOICE_CUSTOM_ID_PREFIX)
            .and_then(|raw| raw.parse::<usize>().ok())
        {
            self.tracker.handle_choice(message_id, user_id, index)
        } else if custom_id == REVEAL_CUSTOM_ID {
            self.tracker.handle_reveal(message_id, user_id)
        } else {
            return;
        };

        // 最速正解者：把记名行追加到原问题消息上，失败只记日志
        if let Some(credit_line) = &outcome.credit_line {
            let updated = format!("{}\n\n{}", component.message.content, credit_line);
            let mut message = (*component.message).clone();
            if let Err(err) = message
                .edit(&ctx.http, EditMessage::new().content(updated))
                .await
            {
                error!("❌ 更新最速正解行失败 (消息 {message_id}): {err}");
            }
        }

        let response = CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(outcome.reply)
                .ephemeral(true),
        );
        if let Err(err) = component.create_response(&ctx.http, response).await {
            error!("❌ 回复交互失败 (消息 {message_id}): {err}");
        }
    }
}
