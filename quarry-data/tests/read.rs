use quarry_data::prelude::*;
use quarry_test::{book_repository, seeded_context, titles, Book};

#[tokio::test]
async fn any_pages_in_configured_order() {
    let repo = book_repository(seeded_context()).unwrap();

    let page = repo.any(0, 2, SortOrder::Ascending).await.unwrap();
    assert_eq!(titles(&page), vec!["A", "B"]);

    let page = repo.any(0, 2, SortOrder::Descending).await.unwrap();
    assert_eq!(titles(&page), vec!["E", "D"]);

    let page = repo.any(2, 2, SortOrder::Ascending).await.unwrap();
    assert_eq!(titles(&page), vec!["C", "D"]);
}

#[tokio::test]
async fn zero_take_and_skip_past_end_are_empty() {
    let repo = book_repository(seeded_context()).unwrap();
    assert!(repo.any(0, 0, SortOrder::Ascending).await.unwrap().is_empty());
    assert!(repo.any(10, 5, SortOrder::Ascending).await.unwrap().is_empty());
}

#[tokio::test]
async fn negative_bounds_are_out_of_range() {
    let repo = book_repository(seeded_context()).unwrap();

    let err = repo.any(-1, 2, SortOrder::Ascending).await.unwrap_err();
    assert!(matches!(err, DataError::OutOfRange { argument: "skip", .. }));

    let err = repo
        .query(Filter::eq("author_id", 1), 0, -3, SortOrder::Ascending)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::OutOfRange { argument: "take", .. }));
}

#[tokio::test]
async fn query_filters_before_paging() {
    let repo = book_repository(seeded_context()).unwrap();

    let page = repo
        .query(Filter::eq("author_id", 1), 1, 5, SortOrder::Ascending)
        .await
        .unwrap();
    assert_eq!(titles(&page), vec!["C", "E"]);

    let page = repo
        .query(Filter::gt("pages", 200), 0, 2, SortOrder::Descending)
        .await
        .unwrap();
    assert_eq!(titles(&page), vec!["E", "C"]);
}

#[tokio::test]
async fn query_requires_a_predicate() {
    let repo = book_repository(seeded_context()).unwrap();
    let err = repo
        .query(None::<Filter>, 0, 2, SortOrder::Ascending)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::NullArgument("predicate")));
}

#[tokio::test]
async fn predicate_on_unknown_property_is_rejected() {
    let repo = book_repository(seeded_context()).unwrap();
    let err = repo
        .query(Filter::eq("publisher", "x"), 0, 2, SortOrder::Ascending)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::InvalidSelector(_)));

    let err = repo.count(Filter::eq("publisher", "x")).await.unwrap_err();
    assert!(matches!(err, DataError::InvalidSelector(_)));
}

#[tokio::test]
async fn count_with_and_without_predicate() {
    let repo = book_repository(seeded_context()).unwrap();
    assert_eq!(repo.count(None::<Filter>).await.unwrap(), 5);
    assert_eq!(repo.count(Filter::eq("author_id", 1)).await.unwrap(), 3);
    assert_eq!(repo.count(Filter::is_null("author_id")).await.unwrap(), 1);
}

#[tokio::test]
async fn first_and_last_follow_configured_order() {
    let repo = book_repository(seeded_context()).unwrap();

    assert_eq!(repo.first(None::<Filter>).await.unwrap().unwrap().title, "A");
    assert_eq!(repo.last(None::<Filter>).await.unwrap().unwrap().title, "E");

    let first = repo.first(Filter::eq("author_id", 2)).await.unwrap();
    assert_eq!(first.map(|b| b.title), Some("B".to_string()));

    assert!(repo.last(Filter::eq("title", "Z")).await.unwrap().is_none());
}

#[tokio::test]
async fn find_missing_key_is_none() {
    let repo = book_repository(seeded_context()).unwrap();
    assert!(repo.find(&42).await.unwrap().is_none());
}

#[tokio::test]
async fn find_loads_reference_and_collection() {
    let repo = book_repository(seeded_context()).unwrap();

    let book: Book = repo.find(&1).await.unwrap().unwrap();
    assert_eq!(book.author.as_ref().map(|a| a.name.as_str()), Some("Ursula"));
    let chapter_ids: Vec<i64> = book.chapters.iter().map(|c| c.id).collect();
    assert_eq!(chapter_ids, vec![11, 12]);

    let lonely = repo.find(&4).await.unwrap().unwrap();
    assert!(lonely.author.is_none());
    assert!(lonely.chapters.is_empty());
}

#[tokio::test]
async fn paged_results_load_includes() {
    let repo = book_repository(seeded_context()).unwrap();
    let page = repo.any(2, 1, SortOrder::Ascending).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].chapters.len(), 1);
    assert_eq!(page[0].author.as_ref().map(|a| a.id), Some(1));
}

fn ids(books: &[Book]) -> Vec<i64> {
    books.iter().map(|b| b.id).collect()
}

#[tokio::test]
async fn every_window_is_a_slice_of_the_full_ordering() {
    let repo = book_repository(seeded_context()).unwrap();
    let ascending = ids(&repo.any(0, 100, SortOrder::Ascending).await.unwrap());
    let mut descending = ascending.clone();
    descending.reverse();
    assert_eq!(ascending, vec![1, 2, 3, 4, 5]);

    let n = ascending.len();
    for (order, full) in [(SortOrder::Ascending, &ascending), (SortOrder::Descending, &descending)] {
        for skip in 0..=n + 1 {
            for take in 0..=n + 1 {
                let page = repo.any(skip as i64, take as i64, order).await.unwrap();
                let start = skip.min(n);
                let end = (skip + take).min(n);
                assert_eq!(ids(&page), full[start..end], "{order} skip {skip} take {take}");
            }
        }
    }
}

#[tokio::test]
async fn identical_reads_return_identical_results() {
    let repo = book_repository(seeded_context()).unwrap();
    for order in [SortOrder::Ascending, SortOrder::Descending] {
        for skip in 0..4 {
            let first = repo.any(skip, 2, order).await.unwrap();
            let second = repo.any(skip, 2, order).await.unwrap();
            assert_eq!(first, second);

            let predicate = Filter::gt("pages", 100);
            let first = repo.query(predicate.clone(), skip, 2, order).await.unwrap();
            let second = repo.query(predicate, skip, 2, order).await.unwrap();
            assert_eq!(first, second);
        }
    }
}

#[tokio::test]
async fn query_results_satisfy_their_predicate() {
    let repo = book_repository(seeded_context()).unwrap();
    let predicates = [
        Filter::eq("author_id", 1),
        Filter::gte("pages", 210),
        Filter::is_null("author_id"),
        Filter::like("title", "_"),
        Filter::is_in("id", [2, 4, 9]),
        !Filter::eq("author_id", 1),
        Filter::lt("pages", 200).or(Filter::eq("title", "E")),
    ];
    let everything = quarry_test::sample_books();
    for predicate in predicates {
        let found = repo
            .query(predicate.clone(), 0, 100, SortOrder::Ascending)
            .await
            .unwrap();
        for book in &found {
            let row = quarry_data::entity::to_row(book).unwrap();
            assert!(predicate.matches(&row), "{predicate:?} returned {}", book.title);
        }
        let expected: Vec<i64> = everything
            .iter()
            .filter(|b| predicate.matches(&quarry_data::entity::to_row(*b).unwrap()))
            .map(|b| b.id)
            .collect();
        assert_eq!(ids(&found), expected, "{predicate:?}");
        assert_eq!(repo.count(predicate).await.unwrap(), expected.len() as u64);
    }
}
