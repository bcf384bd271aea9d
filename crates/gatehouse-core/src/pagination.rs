//! Pagination, search and filter engine
//!
//! Turns page / page-size / search / filter inputs into a bounded window and
//! the navigation metadata returned alongside list results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Entities that can be searched case-insensitively by free text
pub trait Searchable {
    /// Column names matched against every search term
    fn searchable_fields() -> &'static [&'static str];
}

/// A validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// Build a request, clamping `page` to at least 1.
    ///
    /// Returns `None` when `page_size` is zero.
    pub fn new(page: i64, page_size: u32) -> Option<Self> {
        if page_size == 0 {
            return None;
        }
        let page = page.clamp(1, u32::MAX as i64) as u32;
        Some(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Number of rows to skip
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }
}

/// Everything a list query needs: window, search and equality filters
#[derive(Debug, Clone)]
pub struct ListQuery<F> {
    pub page: PageRequest,
    pub terms: Vec<String>,
    pub fields: &'static [&'static str],
    pub filters: F,
}

impl<F> ListQuery<F> {
    /// Build a query for a searchable entity type
    pub fn for_entity<E: Searchable>(page: PageRequest, search: &str, filters: F) -> Self {
        Self {
            page,
            terms: search_terms(search),
            fields: E::searchable_fields(),
            filters,
        }
    }
}

/// Split free text into search terms on `;`, trimming and dropping blanks
pub fn search_terms(search: &str) -> Vec<String> {
    search
        .split(';')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether `page` addresses at least one row of `total_count`.
///
/// This is the one place the list endpoints decide between returning a
/// page and returning "no records found".
pub fn page_in_range(page: u32, page_size: u32, total_count: u64) -> bool {
    if total_count == 0 || page_size == 0 {
        return false;
    }
    let page = page.max(1) as u64;
    (page - 1) * (page_size as u64) < total_count
}

/// Navigation links for a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageLinks {
    pub current_page: String,
    pub first_page: String,
    pub last_page: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<String>,
}

/// Page metadata returned with list results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub search: String,
    #[schema(example = "Showing 21 to 30 from 95 item(s).")]
    pub info: String,
    pub page: u32,
    pub total_count: u64,
    pub total_pages: u64,
    pub page_size: u32,
    pub links: PageLinks,
    #[serde(skip)]
    pub start_index: u64,
    #[serde(skip)]
    pub end_index: u64,
}

/// Build page metadata and navigation links.
///
/// `page` is clamped to 1; it is not clamped against the page count, the
/// caller filters out-of-range pages with [`page_in_range`] first.
/// `page_size` must be non-zero.
pub fn build_page_meta(
    base_url: &str,
    search: &str,
    page: u32,
    page_size: u32,
    total_count: u64,
    filters: &BTreeMap<String, String>,
) -> PageMeta {
    let page = page.max(1);
    let size = page_size as u64;
    let total_pages = total_count.div_ceil(size);

    let build_url = |n: u64| {
        let mut query = format!("?page={n}&page_size={page_size}");
        if !search.is_empty() {
            query.push_str("&search=");
            query.push_str(&urlencoding::encode(search));
        }
        for (key, value) in filters {
            query.push('&');
            query.push_str(&urlencoding::encode(key));
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }
        format!("{base_url}{query}")
    };

    let current = page as u64;
    let next_page = (current * size < total_count).then(|| build_url(current + 1));
    let prev_page = (current > 1).then(|| build_url(current - 1));

    let start_index = (current - 1) * size + 1;
    let end_index = (start_index + size - 1).min(total_count);

    PageMeta {
        search: search.to_string(),
        info: format!("Showing {start_index} to {end_index} from {total_count} item(s)."),
        page,
        total_count,
        total_pages,
        page_size,
        links: PageLinks {
            current_page: build_url(current),
            first_page: build_url(1),
            last_page: build_url(total_pages),
            next_page,
            prev_page,
        },
        start_index,
        end_index,
    }
}
