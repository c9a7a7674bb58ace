// ── Listing state and output ──

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use carehub_api::{ListParams, Page};

use crate::error::CoreError;

/// Which data source a listing shows. Exactly one is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum FilterMode {
    #[default]
    Unfiltered,
    ByCategory(String),
    ByCondition(String),
    ByFreeText(String),
}

impl FilterMode {
    /// Trim the filter value. A blank value means no filter.
    pub fn normalized(self) -> Self {
        let (value, rebuild): (String, fn(String) -> Self) = match self {
            Self::Unfiltered => return Self::Unfiltered,
            Self::ByCategory(v) => (v, Self::ByCategory),
            Self::ByCondition(v) => (v, Self::ByCondition),
            Self::ByFreeText(v) => (v, Self::ByFreeText),
        };
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::Unfiltered
        } else if trimmed.len() == value.len() {
            rebuild(value)
        } else {
            rebuild(trimmed.to_owned())
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unfiltered => f.write_str("all"),
            Self::ByCategory(v) => write!(f, "category={v}"),
            Self::ByCondition(v) => write!(f, "condition={v}"),
            Self::ByFreeText(v) => write!(f, "search={v}"),
        }
    }
}

/// Query parameter names used for each filter mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterParams {
    pub category: String,
    pub condition: String,
    pub search: String,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            category: "categoryId".into(),
            condition: "condition".into(),
            search: "search".into(),
        }
    }
}

/// Single source of truth for what a listing displays.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterSelection {
    pub mode: FilterMode,
    pub page_number: u32,
    pub page_size: u32,
}

impl FilterSelection {
    pub fn new(page_size: u32) -> Self {
        Self {
            mode: FilterMode::Unfiltered,
            page_number: 1,
            page_size: page_size.max(1),
        }
    }

    /// Request parameters for this selection.
    pub fn to_params(&self, names: &FilterParams) -> ListParams {
        let params = ListParams::paged(self.page_number, self.page_size);
        match &self.mode {
            FilterMode::Unfiltered => params,
            FilterMode::ByCategory(v) => params.filter(&names.category, v),
            FilterMode::ByCondition(v) => params.filter(&names.condition, v),
            FilterMode::ByFreeText(v) => params.filter(&names.search, v),
        }
    }
}

/// The rows of the page currently shown. Derefs to a slice.
pub struct Rows<T>(pub(crate) Option<Arc<Page<T>>>);

impl<T> Deref for Rows<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        match &self.0 {
            Some(page) => &page.items,
            None => &[],
        }
    }
}

impl<T> Clone for Rows<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for Rows<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: fmt::Debug> fmt::Debug for Rows<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// What a listing screen renders.
#[derive(Debug)]
pub struct ListingView<T> {
    pub rows: Rows<T>,
    pub page_number: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<Arc<CoreError>>,
    /// The backend answered with an unrecognized body; rows are empty.
    pub degraded: bool,
    pub selection: FilterSelection,
    pub(crate) generation: u64,
}

impl<T> ListingView<T> {
    pub(crate) fn initial(selection: FilterSelection) -> Self {
        Self {
            rows: Rows::default(),
            page_number: selection.page_number,
            total_pages: 1,
            total_records: 0,
            is_loading: true,
            is_error: false,
            error: None,
            degraded: false,
            selection,
            generation: 0,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }
}

impl<T> Clone for ListingView<T> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            page_number: self.page_number,
            total_pages: self.total_pages,
            total_records: self.total_records,
            is_loading: self.is_loading,
            is_error: self.is_error,
            error: self.error.clone(),
            degraded: self.degraded,
            selection: self.selection.clone(),
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn each_mode_routes_to_its_parameter() {
        let names = FilterParams::default();
        let mut selection = FilterSelection::new(5);

        assert_eq!(selection.to_params(&names), ListParams::paged(1, 5));

        selection.mode = FilterMode::ByCategory("3".into());
        assert_eq!(
            selection.to_params(&names),
            ListParams::paged(1, 5).filter("categoryId", "3")
        );

        selection.mode = FilterMode::ByFreeText("wheel".into());
        selection.page_number = 2;
        assert_eq!(
            selection.to_params(&names).to_query(),
            vec![
                ("pageNumber".to_owned(), "2".to_owned()),
                ("pageSize".to_owned(), "5".to_owned()),
                ("search".to_owned(), "wheel".to_owned()),
            ]
        );
    }

    #[test]
    fn blank_filter_values_mean_unfiltered() {
        assert_eq!(FilterMode::ByCategory("  2 ".into()).normalized(), FilterMode::ByCategory("2".into()));
        assert_eq!(FilterMode::ByCondition(" ".into()).normalized(), FilterMode::Unfiltered);
        assert_eq!(FilterMode::ByFreeText(String::new()).normalized(), FilterMode::Unfiltered);
    }

    #[test]
    fn empty_rows_deref_to_empty_slice() {
        let rows: Rows<u32> = Rows::default();
        assert!(rows.is_empty());
    }
}
