mod context;
mod fixtures;

pub use context::{book_repository, library_model, seeded_context, RecordingContext, StatementRejected};
pub use fixtures::{sample_authors, sample_books, sample_chapters, titles, Author, Book, Chapter};
