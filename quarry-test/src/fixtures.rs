use garde::Validate;
use quarry_core::{validate_model, ValidationErrors};
use quarry_data::{Entity, Navigation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Author {
    #[garde(skip)]
    pub id: i64,
    #[garde(length(min = 1))]
    pub name: String,
}

impl Entity for Author {
    type Key = i64;

    fn table_name() -> &'static str {
        "authors"
    }

    fn key_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_model(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: i64,
    pub book_id: i64,
    pub number: i64,
    pub title: String,
}

impl Entity for Chapter {
    type Key = i64;

    fn table_name() -> &'static str {
        "chapters"
    }

    fn key_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "book_id", "number", "title"]
    }

    fn key(&self) -> i64 {
        self.id
    }
}

/// A book with a reference navigation (`author`) and a collection
/// navigation (`chapters`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Book {
    #[garde(skip)]
    pub id: i64,
    #[garde(length(min = 1))]
    pub title: String,
    #[garde(skip)]
    pub author_id: Option<i64>,
    #[garde(range(min = 0))]
    pub pages: i64,
    #[serde(default)]
    #[garde(skip)]
    pub author: Option<Author>,
    #[serde(default)]
    #[garde(skip)]
    pub chapters: Vec<Chapter>,
}

impl Book {
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            author_id: None,
            pages: 100,
            author: None,
            chapters: Vec::new(),
        }
    }

    pub fn by(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn pages(mut self, pages: i64) -> Self {
        self.pages = pages;
        self
    }
}

impl Entity for Book {
    type Key = i64;

    fn table_name() -> &'static str {
        "books"
    }

    fn key_column() -> &'static str {
        "id"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "title", "author_id", "pages"]
    }

    fn navigations() -> Vec<Navigation> {
        vec![
            Navigation::reference::<Author>("author", "author_id"),
            Navigation::collection::<Chapter>("chapters", "id", "book_id"),
        ]
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn validate(&self) -> Result<(), ValidationErrors> {
        validate_model(self)
    }
}

/// Books `A` to `E` with ids 1 to 5; `A`, `C` and `E` are by author 1.
pub fn sample_books() -> Vec<Book> {
    vec![
        Book::new(1, "A").by(1).pages(120),
        Book::new(2, "B").by(2).pages(340),
        Book::new(3, "C").by(1).pages(210),
        Book::new(4, "D").pages(90),
        Book::new(5, "E").by(1).pages(500),
    ]
}

pub fn sample_authors() -> Vec<Author> {
    vec![
        Author {
            id: 1,
            name: "Ursula".into(),
        },
        Author {
            id: 2,
            name: "Frank".into(),
        },
    ]
}

/// Two chapters for book 1, one for book 3, inserted out of key order.
pub fn sample_chapters() -> Vec<Chapter> {
    vec![
        Chapter {
            id: 12,
            book_id: 1,
            number: 2,
            title: "Middle".into(),
        },
        Chapter {
            id: 11,
            book_id: 1,
            number: 1,
            title: "Opening".into(),
        },
        Chapter {
            id: 31,
            book_id: 3,
            number: 1,
            title: "Only".into(),
        },
    ]
}

pub fn titles(books: &[Book]) -> Vec<&str> {
    books.iter().map(|b| b.title.as_str()).collect()
}
