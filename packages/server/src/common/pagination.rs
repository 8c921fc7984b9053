//! Cursor pagination for message history.
//!
//! Pages walk backwards through time: a page holds the newest `limit` messages
//! older than the cursor, and the cursor handed back to the client points at the
//! oldest message of that page.
//!
//! ```rust,ignore
//! let args = PageArgs { cursor: req.cursor, limit: req.limit }.validate()?;
//! let rows = Message::find_page(chat_id, parent_id, &args, pool).await?;
//! let (rows, has_more) = trim_results(rows, args.limit);
//! ```

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i32 = 25;
pub const MAX_PAGE_SIZE: i32 = 100;

/// Opaque cursor (base64-encoded id of the boundary row).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(Uuid);

impl Cursor {
    pub fn new(id: Uuid) -> Self {
        Cursor(id)
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }

    pub fn encode_uuid(id: Uuid) -> String {
        Cursor::new(id).encode()
    }

    pub fn decode(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .context("Invalid cursor: not valid base64")?;
        let uuid = Uuid::from_slice(&bytes).context("Invalid cursor: not a valid UUID")?;
        Ok(Cursor(uuid))
    }

    pub fn into_uuid(self) -> Uuid {
        self.0
    }
}

/// Raw paging input as it arrives from a client.
#[derive(Debug, Clone, Default)]
pub struct PageArgs {
    pub cursor: Option<String>,
    pub limit: Option<i32>,
}

impl PageArgs {
    /// Applies the default size, clamps it to 1..=100 and decodes the cursor.
    pub fn validate(&self) -> Result<ValidatedPageArgs, &'static str> {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let cursor = self
            .cursor
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(Cursor::decode)
            .transpose()
            .map_err(|_| "Invalid cursor")?
            .map(Cursor::into_uuid);

        Ok(ValidatedPageArgs { limit, cursor })
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedPageArgs {
    /// Page size (1-100, default 25).
    pub limit: i32,
    /// Id of the oldest row of the previous page.
    pub cursor: Option<Uuid>,
}

impl ValidatedPageArgs {
    /// SQL LIMIT value (limit + 1 to detect more rows).
    pub fn fetch_limit(&self) -> i64 {
        (self.limit + 1) as i64
    }
}

/// Trims rows fetched with `fetch_limit` back to `limit`, reporting whether
/// more rows exist.
pub fn trim_results<T>(mut results: Vec<T>, limit: i32) -> (Vec<T>, bool) {
    let has_more = results.len() > limit as usize;
    results.truncate(limit as usize);
    (results, has_more)
}
