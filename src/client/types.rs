//! Type definitions for the Trello API.
//!
//! Records returned by the client are immutable snapshots of the server state at
//! call time. Each one is decoded through a private wire type that mirrors Trello's
//! camelCase JSON, then converted into the public record so every collection is a
//! freshly built container.
//!
//! ## Key Types
//!
//! - [`Card`] - A card with its list, board, due date, members and labels
//! - [`Checklist`] - A named, ordered set of [`CheckItem`]s on a card
//! - [`Member`], [`TrelloList`], [`Board`] - Supporting board resources
//!
//! ## API Compatibility
//!
//! - [`Card::url`] comes from `url`, falling back to `shortUrl`
//! - [`CheckItem::checked`] is derived from Trello's `state` field
//! - Check items are ordered by `pos` when Trello supplies it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Colors Trello accepts for card labels.
pub const LABEL_COLORS: &[&str] = &[
    "green", "yellow", "orange", "red", "purple", "blue", "sky", "lime", "pink", "black",
];

pub const DEFAULT_LABEL_COLOR: &str = "blue";

/// A Trello card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CardResponse")]
pub struct Card {
    /// Identifier assigned by Trello; never changes.
    pub id: String,
    pub name: String,
    pub description: String,
    /// Canonical card URL
    pub url: String,
    pub board_id: String,
    pub list_id: String,
    pub due: Option<DateTime<Utc>>,
    /// Member ids; order carries no meaning.
    pub members: Vec<String>,
    pub labels: Vec<Label>,
}

/// Label descriptor attached to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Trello allows colorless labels.
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardResponse {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    short_url: Option<String>,
    #[serde(default)]
    id_board: String,
    #[serde(default)]
    id_list: String,
    #[serde(default)]
    due: Option<DateTime<Utc>>,
    #[serde(default)]
    id_members: Vec<String>,
    #[serde(default)]
    labels: Vec<Label>,
}

impl From<CardResponse> for Card {
    fn from(raw: CardResponse) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            description: raw.desc,
            url: raw.url.or(raw.short_url).unwrap_or_default(),
            board_id: raw.id_board,
            list_id: raw.id_list,
            due: raw.due,
            members: raw.id_members,
            labels: raw.labels,
        }
    }
}

/// A checklist on a card. Item order is display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChecklistResponse")]
pub struct Checklist {
    pub id: String,
    pub name: String,
    pub card_id: Option<String>,
    pub items: Vec<CheckItem>,
}

/// One entry of a [`Checklist`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CheckItemResponse")]
pub struct CheckItem {
    pub id: String,
    pub name: String,
    pub checked: bool,
    #[serde(skip)]
    pos: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChecklistResponse {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    id_card: Option<String>,
    #[serde(default)]
    check_items: Vec<CheckItem>,
}

impl From<ChecklistResponse> for Checklist {
    fn from(raw: ChecklistResponse) -> Self {
        let mut items = raw.check_items;
        // Items without a position go last, in response order.
        items.sort_by(|a, b| {
            a.pos
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.pos.unwrap_or(f64::INFINITY))
        });
        Self {
            id: raw.id,
            name: raw.name,
            card_id: raw.id_card,
            items,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckItemResponse {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    checked: Option<bool>,
    #[serde(default)]
    pos: Option<f64>,
}

impl From<CheckItemResponse> for CheckItem {
    fn from(raw: CheckItemResponse) -> Self {
        let checked = match raw.state.as_deref() {
            Some(state) => state == "complete",
            None => raw.checked.unwrap_or(false),
        };
        Self {
            id: raw.id,
            name: raw.name,
            checked,
            pos: raw.pos,
        }
    }
}

/// A Trello member as listed on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(rename = "fullName", alias = "full_name", default)]
    pub full_name: String,
}

/// A list (column) on a board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrelloList {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub closed: bool,
    #[serde(rename = "idBoard", alias = "board_id", default)]
    pub board_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Response of `GET /search`; only the cards are kept.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub cards: Vec<Card>,
}

// Request payloads

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub name: String,
    pub desc: String,
    pub id_list: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
}

/// Partial card update; unset fields are left out of the body.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_list: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
    /// `Some(None)` clears the due date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChecklistRequest {
    pub id_card: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckItemRequest {
    pub name: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberRequest {
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabelRequest {
    pub color: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    pub name: String,
    pub id_board: String,
}
