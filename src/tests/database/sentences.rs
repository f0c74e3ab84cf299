//! Sentence Store Tests
//!
//! Tests for sentence flushes, the link index and concordance reads.

use futures::TryStreamExt;

use crate::database::{FrequencyOps, SentenceCursor, SentenceOps, StoreError, WordKey};
use crate::tests::common::{create_test_corpus, key};

fn cat() -> WordKey {
    key("猫", "名詞", "一般")
}

fn dog() -> WordKey {
    key("犬", "名詞", "一般")
}

// =============================================================================
// Flush Tests
// =============================================================================

#[tokio::test]
async fn test_flush_writes_sentence_counts_and_links() {
    let (corpus, _temp) = create_test_corpus().await;

    let outcome = corpus
        .flush_sentence("猫と犬。", &[cat(), dog()])
        .await
        .expect("Failed to flush sentence");

    assert_eq!(outcome.links, 2);
    assert_eq!(corpus.count_sentences().await.unwrap(), 1);
    assert_eq!(corpus.count_links().await.unwrap(), 2);
    assert_eq!(corpus.frequency_of(&cat()).await.unwrap(), 1);
    assert_eq!(corpus.frequency_of(&dog()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_word_repeated_in_sentence() {
    let (corpus, _temp) = create_test_corpus().await;

    corpus
        .flush_sentence("猫が猫を見る。", &[cat(), cat()])
        .await
        .unwrap();

    assert_eq!(corpus.frequency_of(&cat()).await.unwrap(), 2);
    assert_eq!(corpus.count_links().await.unwrap(), 2);

    let page = corpus.select_sentences(&cat(), 10, None).await.unwrap();
    assert_eq!(page.sentences.len(), 1);
}

#[tokio::test]
async fn test_duplicate_sentences_are_stored_twice() {
    let (corpus, _temp) = create_test_corpus().await;

    let first = corpus.flush_sentence("猫だ。", &[cat()]).await.unwrap();
    let second = corpus.flush_sentence("猫だ。", &[cat()]).await.unwrap();

    assert_ne!(first.sentence_id, second.sentence_id);
    assert_eq!(corpus.count_sentences().await.unwrap(), 2);
    assert_eq!(corpus.count_links().await.unwrap(), 2);
    assert_eq!(corpus.frequency_of(&cat()).await.unwrap(), 2);

    let page = corpus.select_sentences(&cat(), 10, None).await.unwrap();
    let texts: Vec<_> = page.sentences.iter().map(|s| s.sentence.as_str()).collect();
    assert_eq!(texts, vec!["猫だ。", "猫だ。"]);
}

#[tokio::test]
async fn test_failed_flush_writes_nothing() {
    let (corpus, _temp) = create_test_corpus().await;
    let bad = WordKey::new("犬", ["名詞"]);

    let err = corpus
        .flush_sentence("猫と犬。", &[cat(), bad])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::KeyArity { .. }));
    assert_eq!(corpus.count_sentences().await.unwrap(), 0);
    assert_eq!(corpus.count_words().await.unwrap(), 0);
    assert_eq!(corpus.count_links().await.unwrap(), 0);
}

#[tokio::test]
async fn test_flush_failing_mid_transaction_rolls_back() {
    let (corpus, _temp) = create_test_corpus().await;
    // Sentence and word inserts succeed, the first link insert fails
    sqlx::query(&format!("DROP TABLE {}", corpus.schema().links_table()))
        .execute(corpus.pool())
        .await
        .unwrap();

    let err = corpus
        .flush_sentence("猫と犬。", &[cat(), dog()])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Database(_)));
    assert!(!err.is_caller_error());
    assert_eq!(corpus.count_sentences().await.unwrap(), 0);
    assert_eq!(corpus.count_words().await.unwrap(), 0);
    assert_eq!(corpus.frequency_of(&cat()).await.unwrap(), 0);

    corpus.create().await.expect("Failed to recreate tables");
    corpus.flush_sentence("猫と犬。", &[cat(), dog()]).await.unwrap();
    assert_eq!(corpus.count_sentences().await.unwrap(), 1);
    assert_eq!(corpus.count_links().await.unwrap(), 2);
}

#[tokio::test]
async fn test_link_to_missing_word_is_rejected() {
    let (corpus, _temp) = create_test_corpus().await;
    let sentence_id = corpus.insert_sentence("猫。").await.unwrap();

    let err = corpus.insert_link(9999, sentence_id).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
    assert_eq!(corpus.count_links().await.unwrap(), 0);
}

#[tokio::test]
async fn test_manual_sentence_and_link() {
    let (corpus, _temp) = create_test_corpus().await;

    let word_id = corpus.insert_or_increment(&cat()).await.unwrap();
    let sentence_id = corpus.insert_sentence("猫。").await.unwrap();
    corpus.insert_link(word_id, sentence_id).await.unwrap();

    let page = corpus.select_sentences(&cat(), 10, None).await.unwrap();
    assert_eq!(page.sentences.len(), 1);
    assert_eq!(page.sentences[0].id, sentence_id);
    assert_eq!(page.sentences[0].length, 2);
}

// =============================================================================
// Concordance Tests
// =============================================================================

#[tokio::test]
async fn test_concordance_shortest_first() {
    let (corpus, _temp) = create_test_corpus().await;
    for text in ["吾輩は猫である。", "猫。", "猫が好きだ。"] {
        corpus.flush_sentence(text, &[cat()]).await.unwrap();
    }
    corpus.flush_sentence("犬だけ。", &[dog()]).await.unwrap();

    let page = corpus.select_sentences(&cat(), 10, None).await.unwrap();

    let texts: Vec<_> = page.sentences.iter().map(|s| s.sentence.as_str()).collect();
    assert_eq!(texts, vec!["猫。", "猫が好きだ。", "吾輩は猫である。"]);
    assert_eq!(
        page.sentences.iter().map(|s| s.length).collect::<Vec<_>>(),
        vec![2, 6, 8]
    );
    assert!(page.next.is_none());
}

#[tokio::test]
async fn test_concordance_pages_break_length_ties_by_id() {
    let (corpus, _temp) = create_test_corpus().await;
    let mut ids = Vec::new();
    for text in ["猫だ。", "猫よ。", "猫ね。"] {
        ids.push(corpus.flush_sentence(text, &[cat()]).await.unwrap().sentence_id);
    }

    let first = corpus.select_sentences(&cat(), 2, None).await.unwrap();
    assert_eq!(first.sentences.len(), 2);
    let cursor = first.next.expect("expected a second page");
    assert_eq!(cursor, SentenceCursor { length: 3, id: ids[1] });

    let second = corpus.select_sentences(&cat(), 2, Some(cursor)).await.unwrap();
    assert_eq!(second.sentences.len(), 1);
    assert_eq!(second.sentences[0].id, ids[2]);
    assert!(second.next.is_none());
}

#[tokio::test]
async fn test_concordance_of_unknown_key_is_empty() {
    let (corpus, _temp) = create_test_corpus().await;

    let page = corpus.select_sentences(&cat(), 10, None).await.unwrap();
    assert!(page.sentences.is_empty());
    assert!(page.next.is_none());

    let err = corpus.select_sentences(&cat(), 0, None).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidPageSize));
}

#[tokio::test]
async fn test_stream_sentences_restartable() {
    let (corpus, _temp) = create_test_corpus().await;
    for text in ["猫が好きだ。", "猫。"] {
        corpus.flush_sentence(text, &[cat()]).await.unwrap();
    }
    let key = cat();

    let first: Vec<String> = corpus.stream_sentences(&key).try_collect().await.unwrap();
    let again: Vec<String> = corpus.stream_sentences(&key).try_collect().await.unwrap();

    assert_eq!(first, vec!["猫。", "猫が好きだ。"]);
    assert_eq!(first, again);

    let missing = dog();
    let none: Vec<String> = corpus.stream_sentences(&missing).try_collect().await.unwrap();
    assert!(none.is_empty());
}
