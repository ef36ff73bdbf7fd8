//! Pagination assembly: page/pageSize to offset/limit, store page plus enrichment

use tracing::debug;

use crate::enrichment::{Enricher, EnrichmentPlan};
use crate::models::PageResult;
use crate::store::PowerPlantStore;
use crate::{KazeError, Result};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// A 1-based page request.
///
/// Defaults apply only to absent values; an explicit `0` is kept as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(DEFAULT_PAGE),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    /// `(page - 1) * page_size`
    pub fn offset(&self) -> Result<i64> {
        if self.page < 1 {
            return Err(KazeError::validation(format!(
                "page must be at least 1, got: {}",
                self.page
            )));
        }
        if self.page_size < 0 {
            return Err(KazeError::validation(format!(
                "pageSize must not be negative, got: {}",
                self.page_size
            )));
        }
        (self.page - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| KazeError::validation("page is out of range"))
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Fetch one page from the store and enrich every plant on it.
///
/// Any enrichment failure fails the whole page; the total count is passed
/// through from the store untouched.
pub async fn assemble_page(
    store: &dyn PowerPlantStore,
    enricher: &Enricher,
    request: PageRequest,
    plan: EnrichmentPlan,
) -> Result<PageResult> {
    let offset = request.offset()?;
    let page = store.list(offset, request.limit()).await?;
    debug!(
        "Fetched {} of {} power plants at offset {}",
        page.power_plants.len(),
        page.total_count,
        offset
    );

    let power_plants = enricher.enrich_all(page.power_plants, plan).await?;
    Ok(PageResult {
        power_plants,
        total_count: page.total_count,
    })
}
