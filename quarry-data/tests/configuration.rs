use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quarry_data::prelude::*;
use quarry_data::PropertyPathResolver;
use quarry_test::{library_model, seeded_context, titles, Author, Book};

fn counted_repository(
    ctx: Arc<MemoryContext>,
    calls: Arc<AtomicUsize>,
) -> EntityRepository<Book, MemoryContext> {
    EntityRepository::builder()
        .context(ctx)
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .configure(move |config| {
            calls.fetch_add(1, Ordering::SeqCst);
            config.order_by(property!(Book, title))?;
            Ok(())
        })
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn hook_runs_once_under_concurrent_first_access() {
    let calls = Arc::new(AtomicUsize::new(0));
    let repo = Arc::new(counted_repository(seeded_context(), Arc::clone(&calls)));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let repo = Arc::clone(&repo);
        tasks.push(tokio::spawn(async move {
            repo.any(i % 3, 2, SortOrder::Ascending).await.map(|page| page.len())
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 2);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(repo.configuration().unwrap().is_configured());
}

#[tokio::test]
async fn hook_is_not_run_before_configuration_is_read() {
    let calls = Arc::new(AtomicUsize::new(0));
    let repo = counted_repository(seeded_context(), Arc::clone(&calls));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert_eq!(repo.count(None::<Filter>).await.unwrap(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    repo.first(None::<Filter>).await.unwrap();
    repo.last(None::<Filter>).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn builder_requires_context_and_collection() {
    let err = EntityRepository::<Book, MemoryContext>::builder()
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DataError::NullArgument("context")));

    let err = EntityRepository::<Book, MemoryContext>::builder()
        .context(seeded_context())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DataError::NullArgument("collection")));
}

#[tokio::test]
async fn accessor_without_collection_is_invalid_state() {
    let ctx = Arc::new(MemoryContext::new(Model::builder().entity::<Author>().build()));
    let err = EntityRepository::<Book, MemoryContext>::builder()
        .context(ctx)
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DataError::InvalidState(_)));
}

#[tokio::test]
async fn unordered_repository_cannot_page() {
    let repo = EntityRepository::<Book, MemoryContext>::builder()
        .context(seeded_context())
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .build()
        .unwrap();

    let err = repo.any(0, 2, SortOrder::Ascending).await.unwrap_err();
    assert!(matches!(err, DataError::InvalidState(_)));
    assert!(matches!(repo.first(None::<Filter>).await, Err(DataError::InvalidState(_))));
    assert_eq!(repo.count(None::<Filter>).await.unwrap(), 5);
    assert!(repo.find(&1).await.unwrap().is_some());
}

#[tokio::test]
async fn then_by_before_order_by_fails_the_first_read() {
    let repo = EntityRepository::<Book, MemoryContext>::builder()
        .context(seeded_context())
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .configure(|config| {
            config.then_by("id")?;
            Ok(())
        })
        .build()
        .unwrap();

    let err = repo.any(0, 2, SortOrder::Ascending).await.unwrap_err();
    assert!(matches!(err, DataError::InvalidState(_)));
}

#[tokio::test]
async fn invalid_selector_in_hook_surfaces_as_invalid_selector() {
    let repo = EntityRepository::<Book, MemoryContext>::builder()
        .context(seeded_context())
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .configure(|config| {
            config.order_by("|b| b.title.len()")?;
            Ok(())
        })
        .build()
        .unwrap();

    let err = repo.first(None::<Filter>).await.unwrap_err();
    assert!(matches!(err, DataError::InvalidSelector(_)));
    // The hook failed, so the next read runs it again and fails the same way.
    assert!(matches!(
        repo.configuration(),
        Err(DataError::InvalidSelector(_))
    ));
}

#[tokio::test]
async fn order_by_resets_and_then_by_breaks_ties() {
    let ctx = seeded_context();
    let repo = EntityRepository::<Book, MemoryContext>::builder()
        .context(ctx)
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .configure(|config| {
            config
                .order_by("pages")?
                .order_by("b => b.author_id")?
                .then_by(property!(Book, title))?;
            Ok(())
        })
        .build()
        .unwrap();

    let configuration = repo.configuration().unwrap();
    assert_eq!(configuration.order_keys(), ["author_id", "title"]);

    // Missing author sorts first; ties on author 1 fall back to title.
    let page = repo.any(0, 5, SortOrder::Ascending).await.unwrap();
    assert_eq!(titles(&page), vec!["D", "A", "C", "E", "B"]);
    let page = repo.any(0, 2, SortOrder::Descending).await.unwrap();
    assert_eq!(titles(&page), vec!["B", "E"]);
}

#[tokio::test]
async fn finalised_configuration_rejects_mutation() {
    let repo = EntityRepository::<Book, MemoryContext>::builder()
        .context(seeded_context())
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .configure(|config| {
            config.order_by("id")?.include("author")?;
            Ok(())
        })
        .build()
        .unwrap();

    let mut copy = repo.configuration().unwrap().clone();
    assert!(matches!(copy.order_by("title"), Err(DataError::InvalidState(_))));
    assert!(matches!(copy.include("chapters"), Err(DataError::InvalidState(_))));
    assert_eq!(copy.includes().len(), 1);
}

#[test]
fn configuration_exposes_store_identity() {
    let model = Model::builder()
        .default_schema("library")
        .entity::<Book>()
        .build();
    let ctx = Arc::new(MemoryContext::new(model));
    let repo = EntityRepository::<Book, MemoryContext>::builder()
        .context(ctx)
        .collection(|ctx: &MemoryContext| ctx.set::<Book>())
        .build()
        .unwrap();
    assert_eq!(repo.schema(), Some("library"));
    assert_eq!(repo.table_name(), "books");
    assert!(library_model().mapping_of::<Book>().unwrap().schema.is_none());
}

#[test]
fn resolver_checks_declared_members() {
    assert_eq!(PropertyPathResolver::resolve_column::<Book>("|b: Book| b.pages").unwrap(), "pages");
    assert!(matches!(
        PropertyPathResolver::resolve_column::<Book>("chapters"),
        Err(DataError::InvalidSelector(_))
    ));
    let navigation = PropertyPathResolver::resolve_navigation::<Book>(property!(Book, chapters)).unwrap();
    assert_eq!(navigation.name(), "chapters");
    assert!(PropertyPathResolver::resolve_navigation::<Book>("title").is_err());
}
