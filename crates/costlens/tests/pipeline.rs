use costlens::{
    AggregateOp, AggregateSpec, GroupOptions, PageWindow, Predicate, Query, Record, Scalar,
    Selection, SelectionValue, SortDirection, filter_records, group_records, paginate,
    records_from_json_str, records_to_csv_string, run_query, shares, sort_records_with,
};

const QUOTE_PAYLOAD: &str = r#"[
    {"item_code": "X1-100", "vendor": "Acme",  "bom_path": "Chassis > Frame",  "tags": ["freight"],            "total_amount": 100, "ac_amount": 5},
    {"item_code": "X1-200", "vendor": "Bolt",  "bom_path": "Chassis > Motor",  "tags": ["testing"],            "total_amount": 50,  "ac_amount": 10},
    {"item_code": "X1-300", "vendor": "Acme",  "bom_path": "Chassis > Frame",  "tags": ["freight", "testing"], "total_amount": 30,  "ac_amount": 3},
    {"item_code": "X1-400", "vendor": "Crow",  "bom_path": "Hull",             "tags": [],                     "total_amount": 20,  "ac_amount": 0},
    {"item_code": "X1-500", "vendor": "Bolt",  "bom_path": "Chassis > Motor",  "tags": ["freight"],            "total_amount": 70,  "ac_amount": 7}
]"#;

fn quote_records() -> Vec<Record> {
    records_from_json_str(QUOTE_PAYLOAD).expect("payload parses")
}

#[test]
fn engine_calls_never_mutate_their_input() {
    let records = quote_records();
    let snapshot = records.clone();

    let query = Query::new()
        .filter(Predicate::Substring {
            field: "vendor".to_owned(),
            query: "o".to_owned(),
        })
        .group_by("vendor")
        .aggregate("total_amount", AggregateOp::Sum)
        .sort_by("total_amount", SortDirection::Descending)
        .page(2, 1);

    let first = run_query(&records, &query).expect("query");
    let second = run_query(&records, &query).expect("query again");

    assert_eq!(records, snapshot);
    assert_eq!(first, second);
}

#[test]
fn vendor_dashboard_pass_matches_the_worked_example() {
    let records = vec![
        Record::from_pairs([("vendor", Scalar::from("A")), ("cost", Scalar::Int64(100))]),
        Record::from_pairs([("vendor", Scalar::from("B")), ("cost", Scalar::Int64(50))]),
        Record::from_pairs([("vendor", Scalar::from("A")), ("cost", Scalar::Int64(30))]),
    ];

    let groups = group_records(
        &records,
        "vendor",
        &[AggregateSpec::sum("cost")],
        GroupOptions::default(),
    )
    .expect("group");

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, Scalar::from("A"));
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[0].aggregate("sum_cost"), Some(130.0));
    assert_eq!(groups[1].key, Scalar::from("B"));
    assert_eq!(groups[1].count, 1);
    assert_eq!(groups[1].aggregate("sum_cost"), Some(50.0));
}

#[test]
fn toggle_pills_drive_the_vendor_filter() {
    let mut selection = Selection::All;
    selection = selection.toggle(&SelectionValue::Value(Scalar::from("Acme")));
    selection = selection.toggle(&SelectionValue::Value(Scalar::from("Bolt")));

    let records = quote_records();
    let filtered = filter_records(
        &records,
        &[Predicate::Membership {
            field: "vendor".to_owned(),
            selection: selection.clone(),
        }],
    )
    .expect("filter");
    assert_eq!(filtered.len(), 4);

    selection = selection.toggle(&SelectionValue::Value(Scalar::from("Acme")));
    selection = selection.toggle(&SelectionValue::Value(Scalar::from("Bolt")));
    assert_eq!(selection, Selection::All);

    let unfiltered = filter_records(
        &records,
        &[Predicate::Membership {
            field: "vendor".to_owned(),
            selection,
        }],
    )
    .expect("filter");
    assert_eq!(unfiltered.len(), records.len());
}

#[test]
fn pages_of_a_query_reconstruct_the_filtered_rows() {
    let records = quote_records();
    let base = Query::new().sort_by("total_amount", SortDirection::Ascending);

    let full = run_query(&records, &base).expect("query");
    let size = 2;
    let total_pages = run_query(&records, &base.clone().page(size, 1))
        .expect("query")
        .total_pages;

    let mut rebuilt = Vec::new();
    for number in 1..=total_pages {
        rebuilt.extend(
            run_query(&records, &base.clone().page(size, number))
                .expect("query")
                .page_rows,
        );
    }
    assert_eq!(rebuilt, full.rows);
}

#[test]
fn far_out_page_numbers_clamp_to_the_last_page() {
    let records = quote_records();
    let page = paginate(&records, PageWindow::new(2, 99_999)).expect("page");
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page_number, 3);
    assert_eq!(page.items.len(), 1);
}

#[test]
fn tag_chart_numbers_fan_out_and_share() {
    let records = quote_records();
    let groups = group_records(
        &records,
        "tags",
        &[AggregateSpec::sum("ac_amount")],
        GroupOptions {
            drop_missing_keys: true,
        },
    )
    .expect("group");

    assert_eq!(groups[0].key, Scalar::from("freight"));
    assert_eq!(groups[0].count, 3);
    assert_eq!(groups[0].aggregate("sum_ac_amount"), Some(15.0));
    assert_eq!(groups[1].key, Scalar::from("testing"));
    assert_eq!(groups[1].count, 2);

    let fractions = shares(&groups, "sum_ac_amount").expect("shares");
    assert!((fractions.iter().sum::<f64>() - 1.0).abs() < 1e-9);
}

#[test]
fn derived_percent_sort_ranks_surcharge_heavy_items_first() {
    let records = quote_records();
    let ranked = sort_records_with(&records, SortDirection::Descending, |record| {
        let total = record.scalar_or_null("total_amount").numeric_or_zero();
        if total == 0.0 {
            0.0
        } else {
            record.scalar_or_null("ac_amount").numeric_or_zero() / total
        }
    });

    assert_eq!(
        ranked[0].scalar_or_null("item_code"),
        Scalar::from("X1-200")
    );
}

#[test]
fn query_results_export_back_to_csv() {
    let records = quote_records();
    let query = Query::new().filter(Predicate::PathPrefix {
        field: "bom_path".to_owned(),
        prefix: "Chassis > Frame".to_owned(),
    });

    let result = run_query(&records, &query).expect("query");
    assert_eq!(result.total_matches, 2);

    let csv = records_to_csv_string(&result.rows).expect("export");
    assert!(csv.starts_with("ac_amount,bom_path,item_code,tags,total_amount,vendor"));
    assert!(csv.contains("X1-100"));
    assert!(csv.contains("X1-300"));
}
