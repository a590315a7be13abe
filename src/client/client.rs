use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{
    retry::{classify_status, parse_retry_after, RetryPolicy, Sleeper, StatusClass, TokioSleeper},
    types::*,
};
use crate::config::TrelloConfig;
use crate::error::TrelloError;

type Result<T> = std::result::Result<T, TrelloError>;

/// Query parameters for one request, in addition to `key` and `token`.
pub type Query<'a> = &'a [(&'a str, &'a str)];

pub struct TrelloClient {
    base_url: String,
    client: Client,
    api_key: String,
    token: String,
    retry: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for TrelloClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrelloClient")
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Outcome of one attempt, before the retry decision.
enum Attempt {
    Done { status: u16, text: String },
    RateLimited { retry_after: Option<u64>, body: String },
    Transient { status: Option<u16>, body: String },
    Rejected { status: u16, body: String },
}

impl TrelloClient {
    /// Build a client from validated configuration.
    ///
    /// Fails with [`TrelloError::Configuration`] before any network traffic when
    /// the credentials are missing or blank.
    pub fn new(config: TrelloConfig) -> Result<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    /// Like [`TrelloClient::new`], with a custom clock for backoff waits.
    pub fn with_sleeper(config: TrelloConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TrelloError::config(format!("Failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            "Trello client ready for {} (token {})",
            config.base_url,
            config.token_preview()
        );

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            api_key: config.api_key,
            token: config.token,
            retry: config.retry,
            sleeper,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    // Request layer

    /// Perform one authenticated call and decode the JSON response.
    ///
    /// 429 and 5xx responses and transport failures are retried according to the
    /// client's [`RetryPolicy`]; any other non-2xx status fails immediately.
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (status, text) = self.send_with_retry(method, path, query, body).await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!("Failed to parse response from {}: {}", path, e);
            TrelloError::Api {
                status: Some(status),
                body: format!("Invalid response format from Trello: {} (body: {})", e, text),
            }
        })
    }

    /// Perform one authenticated call whose response body carries no information.
    pub async fn request_ok<B>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<bool>
    where
        B: Serialize + ?Sized,
    {
        self.send_with_retry(method, path, query, body).await?;
        Ok(true)
    }

    async fn send_with_retry<B>(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Result<(u16, String)>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        let mut backoff = self.retry.backoff();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("{} {} (attempt {}/{})", method, path, attempt, max_attempts);

            let outcome = self.attempt(method.clone(), &url, query, body).await;
            let last_attempt = attempt >= max_attempts;

            match outcome {
                Attempt::Done { status, text } => return Ok((status, text)),
                Attempt::Rejected { status, body } => {
                    tracing::error!("{} {} rejected with status {}: {}", method, path, status, body);
                    return Err(TrelloError::Api {
                        status: Some(status),
                        body,
                    });
                }
                Attempt::RateLimited { retry_after, body } => {
                    if last_attempt {
                        tracing::error!(
                            "Rate limit on {} {} persisted after {} attempts",
                            method,
                            path,
                            attempt
                        );
                        return Err(TrelloError::RateLimited { retry_after, body });
                    }
                    // The backoff schedule tracks the attempt number, not just 5xx count.
                    backoff.next();
                    let wait = self.retry.rate_limit_delay(retry_after);
                    tracing::warn!("Rate limited on {} {}, retrying in {:?}", method, path, wait);
                    self.sleeper.sleep(wait).await;
                }
                Attempt::Transient { status, body } => {
                    let next = if last_attempt { None } else { backoff.next() };
                    match next {
                        Some(wait) => {
                            tracing::warn!(
                                "Transient failure on {} {} ({}), retrying in {:?}",
                                method,
                                path,
                                status.map_or_else(|| "network".to_string(), |s| s.to_string()),
                                wait
                            );
                            self.sleeper.sleep(wait).await;
                        }
                        None => {
                            tracing::error!(
                                "{} {} failed after {} attempts: {}",
                                method,
                                path,
                                attempt,
                                body
                            );
                            return Err(TrelloError::Api { status, body });
                        }
                    }
                }
            }
        }
    }

    /// One round trip, classified for the retry loop.
    async fn attempt<B>(
        &self,
        method: Method,
        url: &str,
        query: Query<'_>,
        body: Option<&B>,
    ) -> Attempt
    where
        B: Serialize + ?Sized,
    {
        let mut request = self
            .client
            .request(method, url)
            .query(&[("key", self.api_key.as_str()), ("token", self.token.as_str())]);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                // The URL carries the credentials.
                let e = e.without_url();
                tracing::warn!("Network error calling Trello: {}", e);
                return Attempt::Transient {
                    status: None,
                    body: format!("Failed to reach Trello: {}", e),
                };
            }
        };

        let status = response.status().as_u16();
        match classify_status(status) {
            StatusClass::Success => match response.text().await {
                Ok(text) => Attempt::Done { status, text },
                Err(e) => {
                    let e = e.without_url();
                    tracing::warn!("Response body from Trello was cut short: {}", e);
                    Attempt::Transient {
                        status: None,
                        body: format!("Failed to read response body: {}", e),
                    }
                }
            },
            StatusClass::RateLimited => {
                let retry_after = parse_retry_after(response.headers());
                Attempt::RateLimited {
                    retry_after,
                    body: read_body(response).await,
                }
            }
            StatusClass::ServerError => Attempt::Transient {
                status: Some(status),
                body: read_body(response).await,
            },
            StatusClass::ClientError => Attempt::Rejected {
                status,
                body: read_body(response).await,
            },
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> Result<T> {
        self.request(Method::GET, path, query, None::<&()>).await
    }

    async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    // Cards

    /// Create a card at the bottom of a list.
    pub async fn create_card(
        &self,
        list_id: &str,
        name: &str,
        description: &str,
        due: Option<DateTime<Utc>>,
    ) -> Result<Card> {
        require(list_id, "list_id")?;
        require(name, "name")?;

        let request = CreateCardRequest {
            name: name.to_string(),
            desc: description.to_string(),
            id_list: list_id.to_string(),
            due,
        };
        let card: Card = self.post("/cards", &request).await?;
        tracing::info!("Created card {} in list {}", card.id, card.list_id);
        Ok(card)
    }

    pub async fn get_card(&self, card_id: &str) -> Result<Card> {
        require(card_id, "card_id")?;
        self.get(&format!("/cards/{}", segment(card_id)), &[]).await
    }

    pub async fn move_card(&self, card_id: &str, target_list_id: &str) -> Result<bool> {
        require(card_id, "card_id")?;
        require(target_list_id, "target_list_id")?;
        self.update_card(
            card_id,
            &UpdateCardRequest {
                id_list: Some(target_list_id.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Close a card. Archived cards stay retrievable by id.
    pub async fn archive_card(&self, card_id: &str) -> Result<bool> {
        require(card_id, "card_id")?;
        self.update_card(
            card_id,
            &UpdateCardRequest {
                closed: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    /// Set or, with `None`, clear the due date of a card.
    pub async fn update_card_due_date(
        &self,
        card_id: &str,
        due: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        require(card_id, "card_id")?;
        self.update_card(
            card_id,
            &UpdateCardRequest {
                due: Some(due),
                ..Default::default()
            },
        )
        .await
    }

    async fn update_card(&self, card_id: &str, update: &UpdateCardRequest) -> Result<bool> {
        self.request_ok(
            Method::PUT,
            &format!("/cards/{}", segment(card_id)),
            &[],
            Some(update),
        )
        .await
    }

    pub async fn add_attachment(&self, card_id: &str, url: &str, name: Option<&str>) -> Result<bool> {
        require(card_id, "card_id")?;
        require(url, "url")?;

        let request = AttachmentRequest {
            url: url.to_string(),
            name: name.filter(|n| !n.trim().is_empty()).map(str::to_string),
        };
        self.request_ok(
            Method::POST,
            &format!("/cards/{}/attachments", segment(card_id)),
            &[],
            Some(&request),
        )
        .await
    }

    pub async fn add_comment_to_card(&self, card_id: &str, text: &str) -> Result<bool> {
        require(card_id, "card_id")?;
        require(text, "text")?;
        self.request_ok(
            Method::POST,
            &format!("/cards/{}/actions/comments", segment(card_id)),
            &[],
            Some(&CommentRequest {
                text: text.to_string(),
            }),
        )
        .await
    }

    /// Create a label on the card's board and attach it. `color` defaults to blue.
    pub async fn add_label_to_card(
        &self,
        card_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> Result<bool> {
        require(card_id, "card_id")?;
        require(name, "name")?;
        let color = color.unwrap_or(DEFAULT_LABEL_COLOR);
        if !LABEL_COLORS.contains(&color) {
            return Err(TrelloError::validation(format!(
                "unsupported label color '{}', expected one of: {}",
                color,
                LABEL_COLORS.join(", ")
            )));
        }

        self.request_ok(
            Method::POST,
            &format!("/cards/{}/labels", segment(card_id)),
            &[],
            Some(&LabelRequest {
                color: color.to_string(),
                name: name.to_string(),
            }),
        )
        .await
    }

    /// Search cards by free text, optionally within one board.
    pub async fn search_cards(&self, query: &str, board_id: Option<&str>) -> Result<Vec<Card>> {
        require(query, "query")?;

        let mut params = vec![("query", query), ("modelTypes", "cards")];
        if let Some(board) = board_id.filter(|b| !b.trim().is_empty()) {
            params.push(("idBoards", board));
        }

        let response: SearchResponse = self.get("/search", &params).await?;
        tracing::debug!("Search '{}' matched {} cards", query, response.cards.len());
        Ok(response.cards)
    }

    // Members

    pub async fn add_member_to_card(&self, card_id: &str, member_id: &str) -> Result<bool> {
        require(card_id, "card_id")?;
        require(member_id, "member_id")?;
        self.request_ok(
            Method::POST,
            &format!("/cards/{}/idMembers", segment(card_id)),
            &[],
            Some(&MemberRequest {
                value: member_id.to_string(),
            }),
        )
        .await
    }

    pub async fn remove_member_from_card(&self, card_id: &str, member_id: &str) -> Result<bool> {
        require(card_id, "card_id")?;
        require(member_id, "member_id")?;
        self.request_ok(
            Method::DELETE,
            &format!(
                "/cards/{}/idMembers/{}",
                segment(card_id),
                segment(member_id)
            ),
            &[],
            None::<&()>,
        )
        .await
    }

    pub async fn get_board_members(&self, board_id: &str) -> Result<Vec<Member>> {
        require(board_id, "board_id")?;
        self.get(&format!("/boards/{}/members", segment(board_id)), &[])
            .await
    }

    // Checklists

    pub async fn create_checklist(&self, card_id: &str, name: &str) -> Result<Checklist> {
        require(card_id, "card_id")?;
        require(name, "name")?;

        let request = CreateChecklistRequest {
            id_card: card_id.to_string(),
            name: name.to_string(),
        };
        self.post("/checklists", &request).await
    }

    pub async fn add_checklist_item(
        &self,
        checklist_id: &str,
        name: &str,
        checked: bool,
    ) -> Result<CheckItem> {
        require(checklist_id, "checklist_id")?;
        require(name, "name")?;

        let request = CheckItemRequest {
            name: name.to_string(),
            checked,
        };
        self.post(
            &format!("/checklists/{}/checkItems", segment(checklist_id)),
            &request,
        )
        .await
    }

    /// Create a checklist and then add each item in order.
    ///
    /// Steps are not transactional. If adding an item fails, the error is
    /// returned and the checklist remains on the card with the items added so
    /// far; nothing is rolled back.
    pub async fn create_checklist_with_items<S: AsRef<str>>(
        &self,
        card_id: &str,
        name: &str,
        items: &[S],
    ) -> Result<Checklist> {
        require(card_id, "card_id")?;
        require(name, "name")?;
        for item in items {
            require(item.as_ref(), "item name")?;
        }

        let mut checklist = self.create_checklist(card_id, name).await?;
        for item in items {
            let created = self
                .add_checklist_item(&checklist.id, item.as_ref(), false)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        "Checklist {} left with {} of {} items: {}",
                        checklist.id,
                        checklist.items.len(),
                        items.len(),
                        e
                    );
                    e
                })?;
            checklist.items.push(created);
        }
        Ok(checklist)
    }

    // Boards and lists

    pub async fn get_board(&self, board_id: &str) -> Result<Board> {
        require(board_id, "board_id")?;
        self.get(&format!("/boards/{}", segment(board_id)), &[])
            .await
    }

    pub async fn get_board_lists(&self, board_id: &str) -> Result<Vec<TrelloList>> {
        require(board_id, "board_id")?;
        self.get(&format!("/boards/{}/lists", segment(board_id)), &[])
            .await
    }

    pub async fn get_list(&self, list_id: &str) -> Result<TrelloList> {
        require(list_id, "list_id")?;
        self.get(&format!("/lists/{}", segment(list_id)), &[]).await
    }

    pub async fn create_list(&self, board_id: &str, name: &str) -> Result<TrelloList> {
        require(board_id, "board_id")?;
        require(name, "name")?;

        let request = CreateListRequest {
            name: name.to_string(),
            id_board: board_id.to_string(),
        };
        let list: TrelloList = self.post("/lists", &request).await?;
        tracing::info!("Created list '{}' ({}) on board {}", list.name, list.id, board_id);
        Ok(list)
    }

    /// Return the first open list on the board named `name`, creating it if absent.
    pub async fn find_or_create_list(&self, board_id: &str, name: &str) -> Result<TrelloList> {
        require(board_id, "board_id")?;
        require(name, "name")?;

        let lists = self.get_board_lists(board_id).await?;
        if let Some(existing) = lists.into_iter().find(|l| !l.closed && l.name == name) {
            tracing::debug!("Found list '{}' ({})", name, existing.id);
            return Ok(existing);
        }
        self.create_list(board_id, name).await
    }

    /// Check that the credentials can read a board.
    ///
    /// 401, 403 and 404 mean "no access" and yield `false`; every other failure
    /// is returned as an error.
    pub async fn validate_board_access(&self, board_id: &str) -> Result<bool> {
        match self.get_board(board_id).await {
            Ok(_) => Ok(true),
            Err(TrelloError::Api {
                status: Some(401 | 403 | 404),
                ..
            }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

async fn read_body(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string())
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TrelloError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> TrelloClient {
        TrelloClient::new(TrelloConfig::new("key", "token").with_base_url(base_url)).unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = client("https://api.trello.com/1/");
        assert_eq!(client.url("/cards"), "https://api.trello.com/1/cards");
        assert_eq!(client.url("cards/1"), "https://api.trello.com/1/cards/1");
    }

    #[test]
    fn test_segment_encodes_separators() {
        assert_eq!(segment("abc123"), "abc123");
        assert_eq!(segment("a/b c"), "a%2Fb%20c");
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(require("x", "name").is_ok());
        let err = require("   ", "name").unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: name must not be empty");
    }

    #[test]
    fn test_new_rejects_empty_credentials() {
        let err = TrelloClient::new(TrelloConfig::new("", "token")).unwrap_err();
        assert!(matches!(err, TrelloError::Configuration { .. }));
        let err = TrelloClient::new(TrelloConfig::new("key", "")).unwrap_err();
        assert!(matches!(err, TrelloError::Configuration { .. }));
    }

    #[test]
    fn test_debug_omits_credentials() {
        let client = TrelloClient::new(TrelloConfig::new("very-secret-key", "very-secret-token")).unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("very-secret"));
    }
}
