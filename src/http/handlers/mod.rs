pub mod game;
pub mod question;
pub mod user;

use serde::Deserialize;

/// Shared pagination query parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PageQuery {
    pub fn clamp(&self) -> (i64, i64) {
        let limit = self.limit.clamp(1, 100);
        let offset = (self.page.max(1) - 1) * limit;
        (limit, offset)
    }
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}
