//! HTTP handlers, one module per resource.

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod readers;

use lectern_core::{Page, DEFAULT_PAGE_LIMIT};
use serde::Deserialize;

use crate::error::ApiResult;

/// `?skip=&limit=` query string shared by the listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn into_page(self) -> ApiResult<Page> {
        let page = Page::new(
            self.skip.unwrap_or(0),
            self.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )?;
        Ok(page)
    }
}
