use super::BookPage;

/// A titled, contiguous run of pages produced by the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub pages: Vec<BookPage>,
}

impl Chapter {
    pub fn new(title: impl Into<String>, pages: Vec<BookPage>) -> Self {
        Self {
            title: title.into(),
            pages,
        }
    }

    /// Identifiers of the pages in this chapter, in order.
    pub fn page_ids(&self) -> Vec<u64> {
        self.pages.iter().map(|p| p.id).collect()
    }
}
