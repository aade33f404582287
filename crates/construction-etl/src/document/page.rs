use serde::{Deserialize, Serialize};

use crate::utils::token_estimator::{char_count, estimate_tokens};

/// One page of extracted text. Counts are computed once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    page_number: usize,
    text: String,
    character_count: usize,
    estimated_token_count: usize,
}

impl Page {
    /// `page_number` is 1-indexed
    pub fn new(page_number: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            page_number,
            character_count: char_count(&text),
            estimated_token_count: estimate_tokens(&text),
            text,
        }
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn character_count(&self) -> usize {
        self.character_count
    }

    pub fn estimated_token_count(&self) -> usize {
        self.estimated_token_count
    }
}

/// Number pages 1..n in order
pub fn pages_from_texts<I, S>(texts: I) -> Vec<Page>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Page::new(i + 1, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts() {
        let page = Page::new(3, "x".repeat(10));
        assert_eq!(page.page_number(), 3);
        assert_eq!(page.character_count(), 10);
        assert_eq!(page.estimated_token_count(), 2);

        let empty = Page::new(1, "");
        assert_eq!(empty.estimated_token_count(), 0);
    }

    #[test]
    fn test_pages_from_texts_numbers_from_one() {
        let pages = pages_from_texts(["a", "b", "c"]);
        let numbers: Vec<_> = pages.iter().map(Page::page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
