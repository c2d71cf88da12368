#![forbid(unsafe_code)]

//! Facade over the costlens workspace: one import surface for the whole
//! filter → sort → group → paginate engine.

pub use cl_filter::{FilterError, Predicate, Selection, SelectionValue, filter_records};
pub use cl_group::{
    AggregateOp, AggregateSpec, GroupError, GroupOptions, GroupSummary, group_by_path_level,
    group_records, shares, sort_by_aggregate, top_n,
};
pub use cl_io::{IoError, records_from_csv_str, records_from_json_str, records_to_csv_string};
pub use cl_page::{Page, PageError, PageWindow, paginate};
pub use cl_query::{Query, QueryError, QueryResult, run_query};
pub use cl_record::{FieldCatalog, Record, path_segments};
pub use cl_sort::{
    SortDirection, SortError, SortSpec, sort_records, sort_records_with,
};
pub use cl_types::{DType, FieldValue, Scalar, TypeError, case_fold, infer_dtype, widen_dtype};
