use superstore_dashboard::data::filter::select;
use superstore_dashboard::data::loader::load_csv_bytes;
use superstore_dashboard::{
    Dataset, FilterSpec, MonthKey, PipelineController, PipelineError, PipelineOptions,
};

const CSV: &str = "\
Row ID,Order Date,Ship Mode,Segment,State,Region,Category,Sub-Category,Sales,Profit
1,11/8/2016,Second Class,Consumer,California,West,Furniture,Bookcases,261.96,41.9136
2,11/8/2016,Second Class,Consumer,California,West,Furniture,Chairs,731.94,219.582
3,6/12/2016,Second Class,Corporate,Washington,West,Office Supplies,Labels,14.62,6.8714
4,2015-10-11,Standard Class,Consumer,Washington,West,Furniture,Tables,957.5775,-383.031
5,25/10/2015,Standard Class,Consumer,Oregon,West,Office Supplies,Storage,22.368,2.5164
6,not-a-date,Standard Class,Home Office,California,West,Technology,Phones,907.152,90.7152
7,6/9/2014,Standard Class,Consumer,California,West,Office Supplies,Art,0,-1.5
8,4/15/2017,Standard Class,Corporate,New York,East,Technology,Phones,371.168,41.7564
9,12/5/2016,First Class,Consumer,Ohio,East,Furniture,Chairs,48.86,14.1694
10,1/20/2015,Same Day,Home Office,Texas,Central,Office Supplies,Binders,3.54,-5.487
";

fn dataset() -> Dataset {
    load_csv_bytes(CSV.as_bytes()).unwrap()
}

fn all_specs(ds: &Dataset) -> Vec<FilterSpec> {
    let mut specs = Vec::new();
    for region in ["West", "East", "Central"] {
        specs.push(FilterSpec::for_region(region));
        specs.push(FilterSpec::for_region(region).with_states(["California"]));
        specs.push(FilterSpec::for_region(region).with_categories(["Furniture", "Technology"]));
        specs.push(FilterSpec::for_region(region).with_states(Vec::<String>::new()));
    }
    assert_eq!(ds.len(), 10);
    specs
}

#[test]
fn order_count_is_bounded_and_zero_only_when_empty() {
    let ds = dataset();
    let controller = PipelineController::default();
    for spec in all_specs(&ds) {
        let bundle = controller.run(&ds, &spec).unwrap();
        let view = select(&ds, &spec).unwrap();
        assert!(bundle.metrics.order_count <= ds.len());
        assert_eq!(bundle.metrics.order_count == 0, view.is_empty());
        assert_eq!(bundle.metrics.order_count, bundle.rows.len());
    }
}

#[test]
fn category_totals_match_kpi_total_sales() {
    let ds = dataset();
    let controller = PipelineController::default();
    for spec in all_specs(&ds) {
        let bundle = controller.run(&ds, &spec).unwrap();
        let by_cat = bundle.sales_by_category.total();
        assert!((by_cat - bundle.metrics.total_sales).abs() < 1e-9, "{spec:?}");
        let by_seg = bundle.sales_by_segment.total();
        assert!((by_seg - bundle.metrics.total_sales).abs() < 1e-9, "{spec:?}");
    }
}

#[test]
fn pivot_never_omits_a_selected_pair() {
    let ds = dataset();
    let spec = FilterSpec::for_region("East").with_categories(["Furniture", "Office Supplies"]);
    let bundle = PipelineController::default().run(&ds, &spec).unwrap();
    let pivot = &bundle.region_category;
    assert_eq!(pivot.get("East", "Furniture"), Some(48.86));
    assert_eq!(pivot.get("East", "Office Supplies"), Some(0.0));
    assert_eq!(pivot.cells().count(), 2);
}

#[test]
fn zero_sales_row_does_not_poison_the_margin() {
    let ds = dataset();
    let spec = FilterSpec::for_region("West").with_categories(["Office Supplies"]);
    let bundle = PipelineController::default().run(&ds, &spec).unwrap();
    let m = &bundle.metrics;
    assert_eq!(m.order_count, 3);
    assert_eq!(m.margin_rows, 2);
    assert!(m.avg_profit_margin.is_finite());
    let expected = (6.8714 / 14.62 + 2.5164 / 22.368) / 2.0 * 100.0;
    assert!((m.avg_profit_margin - expected).abs() < 1e-9);
}

#[test]
fn map_view_ignores_the_filter() {
    let ds = dataset();
    let controller = PipelineController::default();
    let everything = controller.run(&ds, &FilterSpec::for_region("West")).unwrap();
    let narrowed = controller
        .run(&ds, &FilterSpec::for_region("East").with_states(["Ohio"]))
        .unwrap();
    assert_eq!(everything.state_map, narrowed.state_map);

    let texas = narrowed.state_map.iter().find(|t| t.state == "Texas").unwrap();
    assert_eq!(texas.sales, 3.54);
    assert_eq!(narrowed.state_map.len(), 6);
}

#[test]
fn top_sub_categories_are_bounded_ordered_and_repeatable() {
    let ds = dataset();
    let controller = PipelineController::new(PipelineOptions { top_n: 3 });
    let spec = FilterSpec::for_region("West");
    let first = controller.run(&ds, &spec).unwrap();
    let again = controller.run(&ds, &spec).unwrap();

    let top = first.top_sub_categories.entries();
    assert_eq!(top.len(), 3);
    assert!(top.windows(2).all(|w| w[0].1 > w[1].1));
    assert_eq!(top[0].0, "Tables");
    assert_eq!(first.top_sub_categories, again.top_sub_categories);
}

#[test]
fn monthly_trend_is_chronological_and_skips_bad_dates() {
    let ds = dataset();
    let bundle = PipelineController::default()
        .run(&ds, &FilterSpec::for_region("West").with_states(["California"]))
        .unwrap();

    let months: Vec<MonthKey> = bundle.monthly_sales.keys().copied().collect();
    assert_eq!(months, [MonthKey::new(2014, 6), MonthKey::new(2016, 11)]);
    assert!(months.windows(2).all(|w| w[0] < w[1]));

    // The undated Phones row is in the KPIs but not in the trend.
    assert_eq!(bundle.metrics.order_count, 4);
    assert!((bundle.metrics.total_sales - (261.96 + 731.94 + 907.152 + 0.0)).abs() < 1e-9);
    assert!((bundle.monthly_sales.total() - (261.96 + 731.94)).abs() < 1e-9);
}

#[test]
fn mixed_date_formats_land_in_the_right_month() {
    let ds = dataset();
    let months: Vec<Option<MonthKey>> = ds.rows().iter().map(|r| r.month).collect();
    assert_eq!(months[3], Some(MonthKey::new(2015, 10)));
    assert_eq!(months[4], Some(MonthKey::new(2015, 10)));
    assert_eq!(months[5], None);
}

#[test]
fn spec_example_end_to_end() {
    let ds = load_csv_bytes(
        b"Order Date,State,Category,Sub-Category,Region,Segment,Sales,Profit\n\
          1/1/2017,CA,Furniture,Chairs,West,Consumer,200,40\n\
          1/2/2017,CA,Furniture,Chairs,West,Consumer,0,-5\n\
          1/3/2017,NY,Tech,Phones,East,Consumer,300,60\n",
    )
    .unwrap();
    let spec = FilterSpec::for_region("West")
        .with_states(["CA"])
        .with_categories(["Furniture"]);
    let bundle = PipelineController::default().run(&ds, &spec).unwrap();

    assert_eq!(bundle.row_indices, [0, 1]);
    assert_eq!(bundle.metrics.total_sales, 200.0);
    assert_eq!(bundle.metrics.total_profit, 35.0);
    assert_eq!(bundle.metrics.order_count, 2);
    assert!((bundle.metrics.avg_profit_margin - 20.0).abs() < 1e-9);
    assert!(bundle.metrics.has_margin_data);
}

#[test]
fn unknown_region_is_a_user_correctable_error() {
    let ds = dataset();
    let err = PipelineController::default()
        .run(&ds, &FilterSpec::for_region("South"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidFilter(_)));
    assert!(err.to_string().contains("South"));
}

#[test]
fn empty_dataset_degrades_to_empty_results() {
    let ds = Dataset::from_rows(Vec::new());
    let bundle = PipelineController::default()
        .run(&ds, &FilterSpec::for_region("West"))
        .unwrap();
    assert_eq!(bundle.metrics.order_count, 0);
    assert!(!bundle.metrics.has_margin_data);
    assert!(bundle.sales_by_category.is_empty());
    assert!(bundle.monthly_sales.is_empty());
    assert!(bundle.region_category.cells().next().is_none());
    assert!(bundle.state_map.is_empty());
}

#[test]
fn bundle_serialises_for_downstream_charts() {
    let ds = dataset();
    let bundle = PipelineController::default()
        .run(&ds, &FilterSpec::for_region("East"))
        .unwrap();
    let json = serde_json::to_value(&bundle).unwrap();
    assert_eq!(json["metrics"]["order_count"], 2);
    assert_eq!(json["monthly_sales"][0]["key"], "2016-12");
    assert_eq!(json["filter"]["region"], "East");
    assert_eq!(json["rows"].as_array().map(Vec::len), Some(2));
}

#[test]
fn blank_amount_neither_aborts_nor_poisons_totals() {
    let csv = format!(
        "{CSV}11,1/22/2015,Same Day,Corporate,Texas,Central,Office Supplies,Paper,,\n\
         12,1/23/2015,Same Day,Corporate,Texas,Central,Office Supplies,Paper,10,NaN\n"
    );
    let ds = load_csv_bytes(csv.as_bytes()).unwrap();
    assert_eq!(ds.len(), 12);

    let bundle = PipelineController::default()
        .run(&ds, &FilterSpec::for_region("Central"))
        .unwrap();
    let m = bundle.metrics;
    assert_eq!(m.order_count, 3);
    assert!((m.total_sales - 13.54).abs() < 1e-9);
    assert!((m.total_profit - -5.487).abs() < 1e-9);
    assert_eq!(m.margin_rows, 1);
    assert!(bundle.projection[1..].iter().all(|p| p.margin_pct.is_none()));
}
