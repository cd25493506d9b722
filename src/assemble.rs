//! Chapter assembly.
//!
//! Merges a flat table of contents with a flat list of pages. The two are
//! related only through ordering keys: an index entry claims every page
//! from its `page_id` up to (not including) the next entry's `page_id`.
//!
//! ```text
//! index:          A@10        B@20 C@20         D@40
//! pages:   1  5 | 10 12 15 |    |    20 25 30 | 40 41
//!          (default)   A     B: empty      C        D
//! ```
//!
//! Pages are walked by a single forward cursor, so assembly is
//! O(n log n) for the sorts plus O(n + m) for the merge.

use std::vec::IntoIter;

use crate::model::{BookIndex, BookPage, Chapter};

/// Group `pages` into chapters according to `indices`.
///
/// Both inputs are sorted (stably) before merging, so callers may pass them
/// in any order. Pages before the first entry form a leading chapter titled
/// `default_title`; with no index at all, every page lands in one chapter
/// with that title. Entries that claim no pages produce no chapter, and
/// entries with a blank title take `default_title` too.
///
/// Every page appears in exactly one chapter, in ascending `id` order, and no
/// returned chapter is empty.
pub fn assemble_chapters(
    mut indices: Vec<BookIndex>,
    mut pages: Vec<BookPage>,
    default_title: &str,
) -> Vec<Chapter> {
    indices.sort_by_key(|entry| entry.page_id);
    pages.sort_by_key(|page| page.id);

    let total = pages.len();
    let mut cursor = PageCursor::new(pages);
    let mut chapters = Vec::with_capacity(indices.len() + 2);

    // Prologue
    if let Some(first) = indices.first() {
        push_chapter(&mut chapters, default_title, cursor.take_below(Some(first.page_id)));
    }

    for (k, entry) in indices.iter().enumerate() {
        let limit = indices.get(k + 1).map(|next| next.page_id);
        let run = cursor.take_below(limit);
        if run.is_empty() {
            log::trace!("Index entry \"{}\" at page {} has no pages", entry.title, entry.page_id);
            continue;
        }
        let title = if entry.title.trim().is_empty() {
            default_title
        } else {
            &entry.title
        };
        push_chapter(&mut chapters, title, run);
    }

    // Epilogue; only reachable with an empty index, since the last entry
    // takes everything that remains
    push_chapter(&mut chapters, default_title, cursor.take_below(None));

    debug_assert_eq!(cursor.yielded(), total);
    log::debug!(
        "Assembled {} pages into {} chapters ({} index entries)",
        total,
        chapters.len(),
        indices.len()
    );

    chapters
}

fn push_chapter(chapters: &mut Vec<Chapter>, title: &str, pages: Vec<BookPage>) {
    if !pages.is_empty() {
        chapters.push(Chapter::new(title, pages));
    }
}

/// Forward-only cursor over sorted pages. Never rewinds.
pub(crate) struct PageCursor {
    pages: std::iter::Peekable<IntoIter<BookPage>>,
    yielded: usize,
}

impl PageCursor {
    pub(crate) fn new(pages: Vec<BookPage>) -> Self {
        Self {
            pages: pages.into_iter().peekable(),
            yielded: 0,
        }
    }

    /// Take pages while `id < limit`, or every remaining page when `limit`
    /// is `None`.
    pub(crate) fn take_below(&mut self, limit: Option<u64>) -> Vec<BookPage> {
        let mut run = Vec::new();
        while let Some(page) = self
            .pages
            .next_if(|page| limit.is_none_or(|limit| page.id < limit))
        {
            run.push(page);
        }
        self.yielded += run.len();
        run
    }

    /// Number of pages handed out so far.
    pub(crate) fn yielded(&self) -> usize {
        self.yielded
    }
}
