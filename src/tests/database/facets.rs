//! Facet Query Tests
//!
//! Tests for grouped frequency pages, keyset pagination and option lists.

use crate::database::{
    Corpus, Facet, FacetOps, FieldValue, FrequencyCursor, SelectionVector, StoreError,
};
use crate::tests::common::{create_test_corpus, key, seed};

const DIMENSIONS: usize = 7;

/// 猫 x3, 犬 x2, 走る x2, 勉強 x1
async fn seeded_corpus() -> (Corpus, tempfile::TempDir) {
    let (corpus, temp) = create_test_corpus().await;
    seed(&corpus, &key("猫", "名詞", "一般"), 3).await;
    seed(&corpus, &key("犬", "名詞", "一般"), 2).await;
    seed(&corpus, &key("走る", "動詞", "自立"), 2).await;
    seed(&corpus, &key("勉強", "名詞", "サ変接続"), 1).await;
    (corpus, temp)
}

fn words(rows: &[crate::database::FrequencyRow]) -> Vec<String> {
    rows.iter()
        .map(|r| r.fields[0].to_string())
        .collect()
}

/// Aggregate everything except the listed dimensions, which are `Any`.
fn grouped_by(dimensions: &[usize]) -> SelectionVector {
    let mut selection = SelectionVector::aggregate_all(DIMENSIONS);
    for &d in dimensions {
        selection.set(d, Facet::Any);
    }
    selection
}

// =============================================================================
// Frequency Pages
// =============================================================================

#[tokio::test]
async fn test_all_any_lists_every_key() {
    let (corpus, _temp) = seeded_corpus().await;

    let page = corpus
        .select_frequencies(&SelectionVector::any(DIMENSIONS), 30, None)
        .await
        .expect("Failed to select frequencies");

    assert_eq!(page.total, 8);
    assert_eq!(page.distinct, 4);
    assert_eq!(words(&page.rows), vec!["猫", "犬", "走る", "勉強"]);
    assert_eq!(
        page.rows.iter().map(|r| r.frequency).collect::<Vec<_>>(),
        vec![3, 2, 2, 1]
    );
    assert!(page.next.is_none());
}

#[tokio::test]
async fn test_group_by_pos0() {
    let (corpus, _temp) = seeded_corpus().await;

    let page = corpus
        .select_frequencies(&grouped_by(&[1]), 30, None)
        .await
        .unwrap();

    assert_eq!(page.total, 8);
    assert_eq!(page.distinct, 4);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0].frequency, 6);
    assert_eq!(page.rows[0].fields[0], FieldValue::Aggregated);
    assert_eq!(page.rows[0].fields[1], FieldValue::Value("名詞".to_string()));
    assert_eq!(page.rows[1].frequency, 2);
    assert_eq!(page.rows[1].fields[1], FieldValue::Value("動詞".to_string()));
}

#[tokio::test]
async fn test_concrete_filter_restricts_totals() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[0]).with(1, Facet::concrete("名詞"));

    let page = corpus.select_frequencies(&selection, 30, None).await.unwrap();

    assert_eq!(page.total, 6);
    assert_eq!(page.distinct, 3);
    assert_eq!(words(&page.rows), vec!["猫", "犬", "勉強"]);
    assert!((page.rows[0].share(page.total) - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_aggregate_all_is_grand_total() {
    let (corpus, _temp) = seeded_corpus().await;

    let page = corpus
        .select_frequencies(&SelectionVector::aggregate_all(DIMENSIONS), 30, None)
        .await
        .unwrap();

    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].frequency, 8);
    assert!(page.rows[0].fields.iter().all(|f| *f == FieldValue::Aggregated));
    assert!(page.next.is_none());
}

#[tokio::test]
async fn test_empty_corpus() {
    let (corpus, _temp) = create_test_corpus().await;

    for selection in [
        SelectionVector::any(DIMENSIONS),
        SelectionVector::aggregate_all(DIMENSIONS),
    ] {
        let page = corpus.select_frequencies(&selection, 10, None).await.unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.distinct, 0);
        assert!(page.rows.is_empty());
        assert!(page.next.is_none());
    }
}

#[tokio::test]
async fn test_filter_on_literal_star() {
    let (corpus, _temp) = seeded_corpus().await;
    seed(&corpus, &key("*", "記号", "一般"), 1).await;

    // A concrete "*" matches only the literal word
    let selection = SelectionVector::any(DIMENSIONS).with(0, Facet::concrete("*"));
    let page = corpus.select_frequencies(&selection, 30, None).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(words(&page.rows), vec!["*"]);

    // Every seeded key has "*" as its third POS field
    let selection = SelectionVector::any(DIMENSIONS).with(3, Facet::concrete("*"));
    let page = corpus.select_frequencies(&selection, 30, None).await.unwrap();
    assert_eq!(page.total, 9);
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_keyset_pagination_resumes_after_ties() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = SelectionVector::any(DIMENSIONS);

    let first = corpus.select_frequencies(&selection, 2, None).await.unwrap();
    assert_eq!(words(&first.rows), vec!["猫", "犬"]);
    let cursor = first.next.clone().expect("expected a second page");
    assert_eq!(cursor.frequency, 2);

    let second = corpus
        .select_frequencies(&selection, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(words(&second.rows), vec!["走る", "勉強"]);
    assert!(second.next.is_none());
    assert_eq!(second.total, first.total);
}

#[tokio::test]
async fn test_page_size_one_walks_every_row() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[0]);

    let mut seen = Vec::new();
    let mut cursor: Option<FrequencyCursor> = None;
    loop {
        let page = corpus
            .select_frequencies(&selection, 1, cursor.as_ref())
            .await
            .unwrap();
        seen.extend(words(&page.rows));
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(seen, vec!["猫", "犬", "走る", "勉強"]);
}

#[tokio::test]
async fn test_paging_with_leading_aggregate() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[1]);

    let first = corpus.select_frequencies(&selection, 1, None).await.unwrap();
    assert_eq!(first.rows.len(), 1);
    assert_eq!(first.rows[0].fields[0], FieldValue::Aggregated);
    assert_eq!(first.rows[0].fields[1], FieldValue::Value("名詞".to_string()));
    assert!(first.rows[0].fields[2..].iter().all(|f| *f == FieldValue::Aggregated));

    let cursor = first.next.expect("expected a second page");
    assert_eq!(cursor.values, vec!["名詞".to_string()]);

    let second = corpus
        .select_frequencies(&selection, 1, Some(&cursor))
        .await
        .expect("Failed to resume after cursor");
    assert_eq!(second.rows.len(), 1);
    assert_eq!(second.rows[0].fields[1], FieldValue::Value("動詞".to_string()));
    assert_eq!(second.rows[0].frequency, 2);
    assert!(second.next.is_none());
}

#[tokio::test]
async fn test_resume_from_printed_cursor() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[0]);

    let first = corpus.select_frequencies(&selection, 2, None).await.unwrap();
    let printed = first.next.as_ref().expect("expected a second page").to_string();
    let parsed: FrequencyCursor = printed.parse().unwrap();

    let resumed = corpus
        .select_frequencies(&selection, 2, Some(&parsed))
        .await
        .unwrap();
    let direct = corpus
        .select_frequencies(&selection, 2, first.next.as_ref())
        .await
        .unwrap();
    assert_eq!(resumed, direct);
    assert_eq!(words(&resumed.rows), vec!["走る", "勉強"]);
}

#[tokio::test]
async fn test_aggregate_between_grouped_dimensions() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[0, 2]);

    let page = corpus.select_frequencies(&selection, 30, None).await.unwrap();
    let top = &page.rows[0];
    assert_eq!(top.fields[0], FieldValue::Value("猫".to_string()));
    assert_eq!(top.fields[1], FieldValue::Aggregated);
    assert_eq!(top.fields[2], FieldValue::Value("一般".to_string()));
}

#[tokio::test]
async fn test_invalid_paging_arguments() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[0]);

    let err = corpus.select_frequencies(&selection, 0, None).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidPageSize));

    let foreign = FrequencyCursor {
        frequency: 2,
        values: vec!["犬".to_string(), "名詞".to_string()],
    };
    let err = corpus
        .select_frequencies(&selection, 5, Some(&foreign))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidCursor { expected: 1, got: 2 }));
}

#[tokio::test]
async fn test_selection_arity_rejected() {
    let (corpus, _temp) = seeded_corpus().await;

    let err = corpus
        .select_frequencies(&SelectionVector::any(3), 10, None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SelectionArity { expected: 7, got: 3 }));
}

#[tokio::test]
async fn test_repeated_reads_are_identical() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = grouped_by(&[0, 1]);

    let a = corpus.select_frequencies(&selection, 30, None).await.unwrap();
    let b = corpus.select_frequencies(&selection, 30, None).await.unwrap();
    assert_eq!(a, b);
}

// =============================================================================
// Options
// =============================================================================

#[tokio::test]
async fn test_options_ignore_own_dimension_filter() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = SelectionVector::any(DIMENSIONS).with(1, Facet::concrete("名詞"));

    let pos0 = corpus.select_options(&selection, 1).await.unwrap();
    assert_eq!(pos0, vec!["動詞", "名詞"]);

    let word = corpus.select_options(&selection, 0).await.unwrap();
    assert_eq!(word, vec!["勉強", "犬", "猫"]);
}

#[tokio::test]
async fn test_options_respect_other_filters() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = SelectionVector::any(DIMENSIONS).with(0, Facet::concrete("走る"));

    assert_eq!(corpus.select_options(&selection, 1).await.unwrap(), vec!["動詞"]);
    assert_eq!(corpus.select_options(&selection, 2).await.unwrap(), vec!["自立"]);
}

#[tokio::test]
async fn test_select_all_options() {
    let (corpus, _temp) = seeded_corpus().await;
    let selection = SelectionVector::any(DIMENSIONS).with(2, Facet::concrete("一般"));

    let options = corpus.select_all_options(&selection).await.unwrap();
    assert_eq!(options.len(), DIMENSIONS);
    assert_eq!(options[0], vec!["犬", "猫"]);
    assert_eq!(options[2], vec!["サ変接続", "一般", "自立"]);
    assert_eq!(options[6], vec!["*"]);
}

#[tokio::test]
async fn test_option_dimension_out_of_range() {
    let (corpus, _temp) = seeded_corpus().await;

    let err = corpus
        .select_options(&SelectionVector::any(DIMENSIONS), DIMENSIONS)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::DimensionOutOfRange { index: 7, dimensions: 7 }
    ));
}
