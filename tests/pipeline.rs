mod common;

use common::{TestWorkspace, movie_fixtures};
use table_align::aggregate::{AggregateSpec, GroupKey, Reducer};
use table_align::data::Value;
use table_align::filter::EqualsOutcome;
use table_align::schema::PipelineConfig;
use table_align::session::AnalysisSession;
use table_align::table::Table;

fn prepare_session() -> AnalysisSession {
    let workspace = TestWorkspace::new();
    let (csv_path, schema_path) = movie_fixtures(&workspace);
    let config = PipelineConfig::load(&schema_path).expect("config");
    let table = Table::from_csv_path(&csv_path, None, None).expect("table");
    AnalysisSession::prepare(config, table).expect("session")
}

#[test]
fn end_to_end_binding_cleans_titles_years_and_ratings() {
    let session = prepare_session();
    let binding = session.binding();
    assert!(binding.is_total());
    assert_eq!(binding.get("Title").expect("title").raw_name, "title ");
    assert_eq!(binding.get("Year").expect("year").raw_name, "release_year");

    let table = session.table();
    let title_idx = binding.raw_index("Title").expect("title idx");
    let year_idx = binding.raw_index("Year").expect("year idx");
    let rating_idx = binding.raw_index("Rating").expect("rating idx");

    assert_eq!(table.display_cell(0, title_idx), "The Matrix");
    assert_eq!(table.cell(0, year_idx), Some(&Value::Integer(1999)));
    assert_eq!(table.cell(0, rating_idx), Some(&Value::Float(8.7)));

    // "not rated" is a column-scoped coercion failure, not a pipeline error
    assert!(table.cell(3, rating_idx).is_none());
    assert_eq!(session.warnings().len(), 1);
    assert_eq!(session.warnings()[0].column, "Rating");
}

#[test]
fn filter_then_aggregate_over_the_subset() {
    let session = prepare_session();

    let crime = match session.filter_equals("Genre", "Crime").expect("outcome") {
        EqualsOutcome::Rows(rows) => rows,
        other => panic!("Expected rows, got {other:?}"),
    };
    assert_eq!(crime.row_count(), 2);

    let spec = AggregateSpec {
        group_keys: vec![GroupKey::Column("Genre".to_string())],
        measure: Some("Rating".to_string()),
        reducer: Reducer::Mean,
    };
    let result = session.aggregate_over(&crime, &spec).expect("result");
    assert_eq!(result.len(), 1);
    assert_eq!(result.rows()[0].key, vec!["Crime".to_string()]);
    // oldboy's rating failed coercion, so only heat's 8.3 contributes
    assert_eq!(result.rows()[0].value, 8.3);
}

#[test]
fn year_range_keeps_the_century_turn() {
    let session = prepare_session();
    let subset = session.filter_range("Year", "1999", "2003").expect("subset");
    assert_eq!(subset.row_count(), 3);
}

#[test]
fn overview_spans_the_year_column() {
    let session = prepare_session();
    let overview = session.overview();
    assert_eq!(overview.rows, 5);
    assert_eq!(
        overview.ordinal_span,
        Some(("Year".to_string(), "1995".to_string(), "2006".to_string()))
    );
}

#[test]
fn ranked_genre_counts_put_ties_in_first_encounter_order() {
    let session = prepare_session();
    let spec = AggregateSpec {
        group_keys: vec![GroupKey::Column("Genre".to_string())],
        measure: None,
        reducer: Reducer::Size,
    };
    let result = session.aggregate(&spec).expect("result");
    let keys: Vec<&str> = result.rows().iter().map(|r| r.key[0].as_str()).collect();
    // sci-fi and crime both count 2 (sci-fi seen first), comedy counts 1
    assert_eq!(keys, vec!["Sci-Fi", "Crime", "Comedy"]);
    assert_eq!(result.top_n(1).rows()[0].key, vec!["Sci-Fi".to_string()]);
}
