//! `POST /rpc/<name>` handlers. Each one deserialises its request, calls one
//! chat activity and returns the activity's result as JSON.

use axum::extract::{Extension, FromRequest};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::common::{ChatId, MessageId, PageArgs, UserId};
use crate::domains::chats::activities::{
    self, AddParticipantsOutcome, AlertLocation, ArchiveOutcome, ChatDetails, ChatListEntry,
    MarkOutcome, MessageItem, MessagePage, NewMessageInput, RevisionOutcome,
};
use crate::domains::chats::models::{ChatType, MessageType};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::middleware::AuthUser;

/// JSON body whose rejections (malformed JSON, wrong shape) become 400s
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct RpcJson<T>(pub T);

type RpcResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub member_ids: Vec<UserId>,
    pub name: Option<String>,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatIdResponse {
    pub chat_id: ChatId,
}

pub async fn create_chat_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<CreateChatRequest>,
) -> RpcResult<ChatIdResponse> {
    let chat_id = activities::create_chat(
        &user.chat_user(),
        req.member_ids,
        req.name,
        req.include_archived,
        &state.deps,
    )
    .await?;
    Ok(Json(ChatIdResponse { chat_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub chat_id: ChatId,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    pub content: String,
    pub parent_id: Option<MessageId>,
    pub quoted_message_id: Option<MessageId>,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdResponse {
    pub message_id: MessageId,
}

pub async fn post_message_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<PostMessageRequest>,
) -> RpcResult<MessageIdResponse> {
    let input = NewMessageInput {
        message_type: req.message_type,
        content: req.content,
        parent_id: req.parent_id,
        quoted_message_id: req.quoted_message_id,
    };
    let message_id =
        activities::post_message(req.chat_id, &user.chat_user(), input, &state.deps).await?;
    Ok(Json(MessageIdResponse { message_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessageContentRequest {
    pub message_id: MessageId,
    pub payload: JsonValue,
    pub locale: Option<String>,
}

pub async fn update_message_content_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<UpdateMessageContentRequest>,
) -> RpcResult<RevisionOutcome> {
    let locale = state.locale(req.locale.as_deref());
    let outcome = activities::update_message_content(
        req.message_id,
        &user.chat_user(),
        req.payload,
        locale,
        &state.deps,
    )
    .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub message_id: MessageId,
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub outcome: MarkOutcome,
}

pub async fn mark_read_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<MessageRequest>,
) -> RpcResult<MarkResponse> {
    let outcome = activities::mark_read(req.message_id, user.user_id, &state.deps).await?;
    Ok(Json(MarkResponse { outcome }))
}

pub async fn mark_delivered_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<MessageRequest>,
) -> RpcResult<MarkResponse> {
    let outcome = activities::mark_delivered(req.message_id, user.user_id, &state.deps).await?;
    Ok(Json(MarkResponse { outcome }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub chat_id: ChatId,
}

pub async fn archive_chat_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<ChatRequest>,
) -> RpcResult<ArchiveOutcome> {
    let outcome = activities::archive_chat(req.chat_id, user.user_id, &state.deps).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveParticipantRequest {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn remove_participant_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<RemoveParticipantRequest>,
) -> RpcResult<SuccessResponse> {
    activities::remove_participant(req.chat_id, user.user_id, req.user_id, &state.deps).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantsRequest {
    pub chat_id: ChatId,
    pub user_ids: Vec<UserId>,
}

pub async fn add_participants_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<AddParticipantsRequest>,
) -> RpcResult<AddParticipantsOutcome> {
    let outcome =
        activities::add_participants(req.chat_id, user.user_id, req.user_ids, &state.deps).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameChatRequest {
    pub chat_id: ChatId,
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameChatResponse {
    pub chat_id: ChatId,
    pub name: Option<String>,
    pub chat_type: ChatType,
}

pub async fn rename_chat_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<RenameChatRequest>,
) -> RpcResult<RenameChatResponse> {
    let chat =
        activities::rename_chat(req.chat_id, &user.chat_user(), &req.name, &state.deps).await?;
    Ok(Json(RenameChatResponse {
        chat_id: chat.id,
        name: chat.name,
        chat_type: chat.chat_type,
    }))
}

#[derive(Debug, Serialize)]
pub struct ListChatsResponse {
    pub chats: Vec<ChatListEntry>,
}

pub async fn list_chats_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
) -> RpcResult<ListChatsResponse> {
    let chats = activities::list_chats(user.user_id, &state.deps).await?;
    Ok(Json(ListChatsResponse { chats }))
}

pub async fn get_chat_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<ChatRequest>,
) -> RpcResult<ChatDetails> {
    let details = activities::get_chat(req.chat_id, user.user_id, &state.deps).await?;
    Ok(Json(details))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMessagesRequest {
    pub chat_id: ChatId,
    pub cursor: Option<String>,
    pub limit: Option<i32>,
    pub parent_id: Option<MessageId>,
}

pub async fn list_messages_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<ListMessagesRequest>,
) -> RpcResult<MessagePage> {
    let page = PageArgs {
        cursor: req.cursor,
        limit: req.limit,
    };
    let messages =
        activities::list_messages(req.chat_id, user.user_id, page, req.parent_id, &state.deps)
            .await?;
    Ok(Json(messages))
}

pub async fn get_message_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<MessageRequest>,
) -> RpcResult<MessageItem> {
    let item = activities::get_message(req.message_id, user.user_id, &state.deps).await?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaiseAlertRequest {
    pub location: Option<AlertLocation>,
    pub locale: Option<String>,
}

pub async fn raise_alert_handler(
    Extension(state): Extension<AppState>,
    user: AuthUser,
    RpcJson(req): RpcJson<RaiseAlertRequest>,
) -> RpcResult<ChatIdResponse> {
    let locale = state.locale(req.locale.as_deref());
    let chat_id =
        activities::raise_alert(&user.chat_user(), req.location, locale, &state.deps).await?;
    Ok(Json(ChatIdResponse { chat_id }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlinePingResponse {
    pub user_id: UserId,
    pub server_time: DateTime<Utc>,
}

/// Presence heartbeat. The auth middleware has already refreshed
/// `last_seen_at` by the time this runs.
pub async fn online_ping_handler(user: AuthUser) -> RpcResult<OnlinePingResponse> {
    Ok(Json(OnlinePingResponse {
        user_id: user.user_id,
        server_time: Utc::now(),
    }))
}
