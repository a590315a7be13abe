use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::*,
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use serde_json::json;

use crate::client::TrelloClient;
use crate::config::TrelloConfig;
use crate::error::TrelloError;

// Parameter structs for tools
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateCardParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Target list id. When absent, `list_name` is looked up (or created) on the board.
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub list_name: Option<String>,
    #[serde(default)]
    pub board_id: Option<String>,
    /// RFC 3339 timestamp, e.g. 2024-03-20T10:00:00Z
    #[serde(default)]
    pub due: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CardParams {
    pub card_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MoveCardParams {
    pub card_id: String,
    pub target_list_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct UpdateDueDateParams {
    pub card_id: String,
    /// RFC 3339 timestamp; omit to clear the due date
    #[serde(default)]
    pub due: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AddAttachmentParams {
    pub card_id: String,
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateChecklistParams {
    pub card_id: String,
    pub name: String,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AddChecklistItemParams {
    pub checklist_id: String,
    pub name: String,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CardMemberParams {
    pub card_id: String,
    pub member_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct BoardParams {
    /// Falls back to the server's default board when omitted
    #[serde(default)]
    pub board_id: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SearchCardsParams {
    pub query: String,
    #[serde(default)]
    pub board_id: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AddCommentParams {
    pub card_id: String,
    pub text: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct AddLabelParams {
    pub card_id: String,
    pub name: String,
    #[serde(default = "default_label_color")]
    pub color: String,
}

fn default_label_color() -> String {
    crate::client::types::DEFAULT_LABEL_COLOR.to_string()
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct CreateListParams {
    pub name: String,
    #[serde(default)]
    pub board_id: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ListParams {
    pub list_id: String,
}

#[derive(Clone)]
pub struct TrelloMcpServer {
    client: Arc<TrelloClient>,
    default_board_id: Option<String>,
    tool_router: ToolRouter<TrelloMcpServer>,
}

#[tool_router]
impl TrelloMcpServer {
    pub fn new(config: TrelloConfig) -> Result<Self, TrelloError> {
        Ok(Self::with_client(Arc::new(TrelloClient::new(config)?)))
    }

    pub fn with_client(client: Arc<TrelloClient>) -> Self {
        Self {
            client,
            default_board_id: None,
            tool_router: Self::tool_router(),
        }
    }

    /// Board used by tools that are called without a `board_id`.
    pub fn with_default_board(mut self, board_id: impl Into<String>) -> Self {
        self.default_board_id = Some(board_id.into());
        self
    }

    pub fn client(&self) -> &TrelloClient {
        &self.client
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect()
    }

    fn board_or_default(&self, board_id: Option<String>) -> Result<String, TrelloError> {
        board_id
            .filter(|b| !b.trim().is_empty())
            .or_else(|| self.default_board_id.clone())
            .ok_or_else(|| TrelloError::Validation {
                message: "board_id is required (no default board configured)".to_string(),
            })
    }

    // Card tools
    #[tool(description = "Create a Trello card in a list, by list id or by list name on a board")]
    pub async fn create_card(
        &self,
        Parameters(params): Parameters<CreateCardParams>,
    ) -> Result<CallToolResult, McpError> {
        let due = match parse_due(params.due.as_deref()) {
            Ok(due) => due,
            Err(e) => return failure("Failed to create card", e),
        };

        let list_id = match (params.list_id, params.list_name) {
            (Some(list_id), _) => list_id,
            (None, Some(list_name)) => {
                let board_id = match self.board_or_default(params.board_id) {
                    Ok(board_id) => board_id,
                    Err(e) => return failure("Failed to create card", e),
                };
                match self.client.find_or_create_list(&board_id, &list_name).await {
                    Ok(list) => list.id,
                    Err(e) => return failure("Failed to resolve list", e),
                }
            }
            (None, None) => {
                return failure(
                    "Failed to create card",
                    TrelloError::Validation {
                        message: "either list_id or list_name is required".to_string(),
                    },
                );
            }
        };

        match self
            .client
            .create_card(
                &list_id,
                &params.name,
                params.description.as_deref().unwrap_or(""),
                due,
            )
            .await
        {
            Ok(card) => success(json!({ "card": card })),
            Err(e) => failure("Failed to create card", e),
        }
    }

    #[tool(description = "Get a card with its list, due date, members and labels")]
    pub async fn get_card(
        &self,
        Parameters(params): Parameters<CardParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.get_card(&params.card_id).await {
            Ok(card) => success(json!({ "card": card })),
            Err(e) => failure("Failed to get card", e),
        }
    }

    #[tool(description = "Move a card to another list")]
    pub async fn move_card(
        &self,
        Parameters(params): Parameters<MoveCardParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .move_card(&params.card_id, &params.target_list_id)
            .await
        {
            Ok(done) => success(json!({
                "success": done,
                "card_id": params.card_id,
                "list_id": params.target_list_id
            })),
            Err(e) => failure("Failed to move card", e),
        }
    }

    #[tool(description = "Archive (close) a card")]
    pub async fn archive_card(
        &self,
        Parameters(params): Parameters<CardParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.archive_card(&params.card_id).await {
            Ok(done) => success(json!({ "success": done, "card_id": params.card_id })),
            Err(e) => failure("Failed to archive card", e),
        }
    }

    #[tool(description = "Set or clear the due date of a card")]
    pub async fn update_card_due_date(
        &self,
        Parameters(params): Parameters<UpdateDueDateParams>,
    ) -> Result<CallToolResult, McpError> {
        let due = match parse_due(params.due.as_deref()) {
            Ok(due) => due,
            Err(e) => return failure("Failed to update due date", e),
        };

        match self.client.update_card_due_date(&params.card_id, due).await {
            Ok(done) => success(json!({
                "success": done,
                "card_id": params.card_id,
                "due": due
            })),
            Err(e) => failure("Failed to update due date", e),
        }
    }

    #[tool(description = "Attach a URL to a card")]
    pub async fn add_attachment(
        &self,
        Parameters(params): Parameters<AddAttachmentParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .add_attachment(&params.card_id, &params.url, params.name.as_deref())
            .await
        {
            Ok(done) => success(json!({ "success": done, "card_id": params.card_id })),
            Err(e) => failure("Failed to add attachment", e),
        }
    }

    #[tool(description = "Add a comment to a card")]
    pub async fn add_comment_to_card(
        &self,
        Parameters(params): Parameters<AddCommentParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .add_comment_to_card(&params.card_id, &params.text)
            .await
        {
            Ok(done) => success(json!({ "success": done, "card_id": params.card_id })),
            Err(e) => failure("Failed to add comment", e),
        }
    }

    #[tool(description = "Add a colored label to a card (green, yellow, orange, red, purple, blue, sky, lime, pink, black)")]
    pub async fn add_label_to_card(
        &self,
        Parameters(params): Parameters<AddLabelParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .add_label_to_card(&params.card_id, &params.name, Some(params.color.as_str()))
            .await
        {
            Ok(done) => success(json!({
                "success": done,
                "card_id": params.card_id,
                "label": { "name": params.name, "color": params.color }
            })),
            Err(e) => failure("Failed to add label", e),
        }
    }

    #[tool(description = "Search cards by text, optionally limited to one board")]
    pub async fn search_cards(
        &self,
        Parameters(params): Parameters<SearchCardsParams>,
    ) -> Result<CallToolResult, McpError> {
        let board_id = params.board_id.or_else(|| self.default_board_id.clone());

        match self
            .client
            .search_cards(&params.query, board_id.as_deref())
            .await
        {
            Ok(cards) => success(json!({
                "total_count": cards.len(),
                "cards": cards
            })),
            Err(e) => failure("Failed to search cards", e),
        }
    }

    // Checklist tools
    #[tool(description = "Create a checklist on a card, optionally with unchecked items")]
    pub async fn create_checklist(
        &self,
        Parameters(params): Parameters<CreateChecklistParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .create_checklist_with_items(&params.card_id, &params.name, &params.items)
            .await
        {
            Ok(checklist) => success(json!({ "checklist": checklist })),
            Err(e) => failure("Failed to create checklist", e),
        }
    }

    #[tool(description = "Add an item to an existing checklist")]
    pub async fn add_checklist_item(
        &self,
        Parameters(params): Parameters<AddChecklistItemParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .add_checklist_item(&params.checklist_id, &params.name, params.checked)
            .await
        {
            Ok(item) => success(json!({ "item": item })),
            Err(e) => failure("Failed to add checklist item", e),
        }
    }

    // Member tools
    #[tool(description = "Assign a board member to a card")]
    pub async fn add_member_to_card(
        &self,
        Parameters(params): Parameters<CardMemberParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .add_member_to_card(&params.card_id, &params.member_id)
            .await
        {
            Ok(done) => success(json!({ "success": done, "member_id": params.member_id })),
            Err(e) => failure("Failed to add member", e),
        }
    }

    #[tool(description = "Remove a member from a card")]
    pub async fn remove_member_from_card(
        &self,
        Parameters(params): Parameters<CardMemberParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .client
            .remove_member_from_card(&params.card_id, &params.member_id)
            .await
        {
            Ok(done) => success(json!({ "success": done, "member_id": params.member_id })),
            Err(e) => failure("Failed to remove member", e),
        }
    }

    #[tool(description = "List the members of a board")]
    pub async fn get_board_members(
        &self,
        Parameters(params): Parameters<BoardParams>,
    ) -> Result<CallToolResult, McpError> {
        let board_id = match self.board_or_default(params.board_id) {
            Ok(board_id) => board_id,
            Err(e) => return failure("Failed to get board members", e),
        };

        match self.client.get_board_members(&board_id).await {
            Ok(members) => success(json!({
                "board_id": board_id,
                "members": members
            })),
            Err(e) => failure("Failed to get board members", e),
        }
    }

    // List tools
    #[tool(description = "List the lists (columns) of a board")]
    pub async fn get_board_lists(
        &self,
        Parameters(params): Parameters<BoardParams>,
    ) -> Result<CallToolResult, McpError> {
        let board_id = match self.board_or_default(params.board_id) {
            Ok(board_id) => board_id,
            Err(e) => return failure("Failed to get board lists", e),
        };

        match self.client.get_board_lists(&board_id).await {
            Ok(lists) => success(json!({
                "board_id": board_id,
                "lists": lists
            })),
            Err(e) => failure("Failed to get board lists", e),
        }
    }

    #[tool(description = "Get a list by id")]
    pub async fn get_list(
        &self,
        Parameters(params): Parameters<ListParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.client.get_list(&params.list_id).await {
            Ok(list) => success(json!({ "list": list })),
            Err(e) => failure("Failed to get list", e),
        }
    }

    #[tool(description = "Create a list on a board")]
    pub async fn create_list(
        &self,
        Parameters(params): Parameters<CreateListParams>,
    ) -> Result<CallToolResult, McpError> {
        let board_id = match self.board_or_default(params.board_id) {
            Ok(board_id) => board_id,
            Err(e) => return failure("Failed to create list", e),
        };

        match self.client.create_list(&board_id, &params.name).await {
            Ok(list) => success(json!({ "list": list })),
            Err(e) => failure("Failed to create list", e),
        }
    }
}

fn parse_due(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, TrelloError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|due| Some(due.with_timezone(&Utc)))
            .map_err(|e| TrelloError::Validation {
                message: format!("due must be an RFC 3339 timestamp, got '{}': {}", raw, e),
            }),
    }
}

fn success(result: serde_json::Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&result)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn failure(action: &str, e: TrelloError) -> Result<CallToolResult, McpError> {
    tracing::warn!("{}: {}", action, e);
    let mut error = json!({
        "error": action,
        "kind": e.kind().to_string(),
        "details": e.to_string(),
        "success": false
    });
    if let Some(status) = e.status() {
        error["status"] = json!(status);
    }
    Ok(CallToolResult::error(vec![Content::text(error.to_string())]))
}

#[tool_handler]
impl ServerHandler for TrelloMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some("This server provides tools for managing a Trello board: creating, moving and archiving cards, due dates, labels, comments, attachments, checklists, card members and board lists. Rate-limited and failed Trello calls are retried automatically; errors report a kind (validation, api, rate_limit, configuration).".to_string()),
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<InitializeResult, McpError> {
        Ok(self.get_info())
    }
}
