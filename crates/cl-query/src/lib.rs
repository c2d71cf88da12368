#![forbid(unsafe_code)]

use cl_filter::{FilterError, Predicate, filter_records};
use cl_group::{AggregateOp, AggregateSpec, GroupError, GroupOptions, GroupSummary, group_records};
use cl_page::{PageError, PageWindow, paginate};
use cl_record::Record;
use cl_sort::{SortDirection, SortError, SortSpec, sort_records};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Sort(#[from] SortError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Page(#[from] PageError),
}

/// One filter/display pass, built fresh per user interaction. The engine
/// holds no state between runs; selected filters and the page number
/// live in the calling view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub group_by: Option<String>,
    pub aggregates: Vec<AggregateSpec>,
    #[serde(default)]
    pub group_options: GroupOptions,
    pub sort: Option<SortSpec>,
    pub page: Option<PageWindow>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    #[must_use]
    pub fn aggregate(mut self, field: impl Into<String>, op: AggregateOp) -> Self {
        self.aggregates.push(AggregateSpec {
            field: field.into(),
            op,
        });
        self
    }

    #[must_use]
    pub fn group_options(mut self, options: GroupOptions) -> Self {
        self.group_options = options;
        self
    }

    #[must_use]
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec {
            field: field.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn page(mut self, size: usize, number: usize) -> Self {
        self.page = Some(PageWindow::new(size, number));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Filtered and sorted, pre-pagination. Chart and aggregate input.
    pub rows: Vec<Record>,
    /// The visible table window.
    pub page_rows: Vec<Record>,
    pub total_matches: usize,
    pub total_pages: usize,
    pub page_number: usize,
    /// Summaries over `rows`, empty without a group-by.
    pub groups: Vec<GroupSummary>,
}

/// Run the full pipeline: filter, sort, group over the whole filtered
/// set, then paginate. Without a page window the result is a single page
/// holding everything.
pub fn run_query(records: &[Record], query: &Query) -> Result<QueryResult, QueryError> {
    let filtered = filter_records(records, &query.predicates)?;

    let rows = match &query.sort {
        Some(spec) => sort_records(&filtered, spec)?,
        None => filtered,
    };

    let groups = match &query.group_by {
        Some(field) => group_records(&rows, field, &query.aggregates, query.group_options)?,
        None => Vec::new(),
    };

    let total_matches = rows.len();
    let (page_rows, total_pages, page_number) = match query.page {
        Some(window) => {
            let page = paginate(&rows, window)?;
            (page.items, page.total_pages, page.page_number)
        }
        None => (rows.clone(), 1, 1),
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        total_matches,
        total_pages,
        page_number,
        groups = groups.len(),
        "query executed"
    );

    Ok(QueryResult {
        rows,
        page_rows,
        total_matches,
        total_pages,
        page_number,
        groups,
    })
}

#[cfg(test)]
mod tests {
    use cl_filter::{Predicate, Selection};
    use cl_group::AggregateOp;
    use cl_record::Record;
    use cl_sort::SortDirection;
    use cl_types::Scalar;

    use super::{Query, run_query};

    fn quote_rows() -> Vec<Record> {
        vec![
            Record::from_pairs([
                ("item_code", Scalar::from("X1")),
                ("vendor", Scalar::from("Acme")),
                ("total_amount", Scalar::Int64(100)),
            ]),
            Record::from_pairs([
                ("item_code", Scalar::from("X2")),
                ("vendor", Scalar::from("Bolt")),
                ("total_amount", Scalar::Int64(50)),
            ]),
            Record::from_pairs([
                ("item_code", Scalar::from("X3")),
                ("vendor", Scalar::from("Acme")),
                ("total_amount", Scalar::Int64(30)),
            ]),
        ]
    }

    #[test]
    fn pipeline_filters_sorts_groups_and_pages() {
        let records = quote_rows();
        let query = Query::new()
            .filter(Predicate::Membership {
                field: "vendor".to_owned(),
                selection: Selection::Values(vec![Scalar::from("Acme")]),
            })
            .group_by("vendor")
            .aggregate("total_amount", AggregateOp::Sum)
            .sort_by("total_amount", SortDirection::Descending)
            .page(1, 2);

        let result = run_query(&records, &query).expect("query");

        assert_eq!(result.total_matches, 2);
        assert_eq!(result.total_pages, 2);
        assert_eq!(result.page_number, 2);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.page_rows.len(), 1);
        assert_eq!(
            result.page_rows[0].scalar_or_null("item_code"),
            Scalar::from("X3")
        );
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].aggregate("sum_total_amount"), Some(130.0));
    }

    #[test]
    fn no_window_means_one_page_with_everything() {
        let records = quote_rows();
        let result = run_query(&records, &Query::new()).expect("query");

        assert_eq!(result.total_matches, 3);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.page_number, 1);
        assert_eq!(result.page_rows, result.rows);
        assert!(result.groups.is_empty());
    }

    #[test]
    fn stage_errors_surface_through_the_query_error() {
        let records = quote_rows();
        let query = Query::new().sort_by("unit_cost", SortDirection::Ascending);
        let err = run_query(&records, &query).expect_err("unknown sort field");
        assert!(err.to_string().contains("unit_cost"));
    }

    #[test]
    fn grouping_runs_over_the_full_filtered_set_not_the_page() {
        let records = quote_rows();
        let query = Query::new()
            .group_by("vendor")
            .aggregate("total_amount", AggregateOp::Sum)
            .page(1, 1);

        let result = run_query(&records, &query).expect("query");
        assert_eq!(result.page_rows.len(), 1);
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0].aggregate("sum_total_amount"), Some(130.0));
        assert_eq!(result.groups[1].aggregate("sum_total_amount"), Some(50.0));
    }
}
