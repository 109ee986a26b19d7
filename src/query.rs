use std::collections::BTreeMap;

use crate::services::ListQuery;

pub const DEFAULT_PAGE_LIMIT: u64 = 10;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// The backend expects the direction uppercased on the wire.
    pub fn wire(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
            total: 0,
            total_pages: 0,
        }
    }
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    total.div_ceil(limit.max(1))
}

/// Per-section search/sort/filter/pagination tuple. Mutated only by explicit
/// user actions; the fetch orchestrator writes back `total`/`total_pages` and
/// nothing else.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryState {
    pub search: String,
    pub sort: SortSpec,
    pub filters: BTreeMap<String, String>,
    pub pagination: Pagination,
}

impl QueryState {
    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.pagination.page = 1;
    }

    /// Clicking the active sort header flips direction; a new field starts
    /// ascending.
    pub fn set_sort(&mut self, field: &str) {
        if self.sort.field == field {
            self.sort.direction = self.sort.direction.toggled();
        } else {
            self.sort = SortSpec {
                field: field.to_string(),
                direction: SortDirection::Asc,
            };
        }
        self.pagination.page = 1;
    }

    /// Empty values drop the filter instead of sending it on the wire.
    pub fn set_filter(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.filters.remove(field);
        } else {
            self.filters.insert(field.to_string(), value.to_string());
        }
        self.pagination.page = 1;
    }

    pub fn set_page(&mut self, page: u64) {
        self.pagination.page = page.max(1);
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.pagination.limit = limit.max(1);
        self.pagination.page = 1;
    }

    /// Write-back from a fetch result. Clamps the current page when the new
    /// total leaves it past the end, so a shrinking result set never pins the
    /// view to a silently empty page. Returns true when a clamp happened.
    pub fn apply_totals(&mut self, total: u64) -> bool {
        self.pagination.total = total;
        self.pagination.total_pages = total_pages(total, self.pagination.limit);
        if self.pagination.total_pages > 0 && self.pagination.page > self.pagination.total_pages {
            self.pagination.page = self.pagination.total_pages;
            return true;
        }
        false
    }

    pub fn to_list_query(&self) -> ListQuery {
        ListQuery {
            page: self.pagination.page,
            limit: self.pagination.limit,
            search: (!self.search.is_empty()).then(|| self.search.clone()),
            sort_by: (!self.sort.field.is_empty()).then(|| self.sort.field.clone()),
            order: (!self.sort.field.is_empty()).then(|| self.sort.direction.wire().to_string()),
            filters: self
                .filters
                .iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect(),
        }
    }
}
