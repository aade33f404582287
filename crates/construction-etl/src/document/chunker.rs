use serde::{Deserialize, Serialize};
use tracing::debug;

use super::page::Page;
use crate::config::ChunkingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Whole document fits the budget
    None,
    /// Greedy page accumulation up to the target
    TokenBased,
}

/// Page range of one chunk, inclusive, in the pages' own numbering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBoundary {
    pub chunk_index: usize,
    pub start_page: usize,
    pub end_page: usize,
    pub estimated_token_count: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl ChunkBoundary {
    pub fn page_count(&self) -> usize {
        self.end_page - self.start_page + 1
    }

    pub fn contains(&self, page_number: usize) -> bool {
        (self.start_page..=self.end_page).contains(&page_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingResult {
    pub total_pages: usize,
    pub total_tokens: usize,
    pub chunking_required: bool,
    pub chunks: Vec<ChunkBoundary>,
    pub strategy: ChunkStrategy,
    pub target_chunk_tokens: usize,
    pub overlap_pages: usize,
}

impl ChunkingResult {
    /// Each boundary paired with its rendered text
    pub fn chunk_texts<'a>(
        &'a self,
        pages: &'a [Page],
    ) -> impl Iterator<Item = (&'a ChunkBoundary, String)> + 'a {
        self.chunks
            .iter()
            .map(move |boundary| (boundary, get_chunk_text(pages, boundary)))
    }
}

/// Plans token-budgeted, page-aligned chunks with overlap
pub struct DocumentChunker {
    config: ChunkingConfig,
}

impl DocumentChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    pub fn compute_chunks(&self, pages: &[Page]) -> ChunkingResult {
        let total_pages = pages.len();
        let total_tokens: usize = pages.iter().map(Page::estimated_token_count).sum();

        let mut result = ChunkingResult {
            total_pages,
            total_tokens,
            chunking_required: false,
            chunks: Vec::new(),
            strategy: ChunkStrategy::None,
            target_chunk_tokens: self.config.target_chunk_tokens,
            overlap_pages: self.config.overlap_pages,
        };

        if pages.is_empty() {
            return result;
        }

        if total_tokens <= self.config.max_tokens {
            debug!(
                "No chunking needed: {} tokens <= {} max",
                total_tokens, self.config.max_tokens
            );
            result.chunks.push(ChunkBoundary {
                chunk_index: 0,
                start_page: pages[0].page_number(),
                end_page: pages[total_pages - 1].page_number(),
                estimated_token_count: total_tokens,
                is_first: true,
                is_last: true,
            });
            return result;
        }

        let ranges = self.plan_ranges(pages);
        let last = ranges.len() - 1;

        result.chunking_required = true;
        result.strategy = ChunkStrategy::TokenBased;
        result.chunks = ranges
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| ChunkBoundary {
                chunk_index: i,
                start_page: pages[start].page_number(),
                end_page: pages[end].page_number(),
                estimated_token_count: pages[start..=end]
                    .iter()
                    .map(Page::estimated_token_count)
                    .sum(),
                is_first: i == 0,
                is_last: i == last,
            })
            .collect();

        debug!(
            "Split {} pages ({} tokens) into {} chunks",
            total_pages,
            total_tokens,
            result.chunks.len()
        );

        result
    }

    /// Greedy 0-indexed inclusive ranges. `pages` must be non-empty.
    fn plan_ranges(&self, pages: &[Page]) -> Vec<(usize, usize)> {
        let n = pages.len();
        let target = self.config.target_chunk_tokens;
        let overlap = self.config.overlap_pages;
        let min_pages = self.config.min_chunk_pages.max(1);

        let mut ranges = Vec::new();
        let mut start = 0;

        loop {
            let mut end = start;
            let mut tokens = pages[start].estimated_token_count();

            while end + 1 < n {
                let next = pages[end + 1].estimated_token_count();
                if end - start + 1 >= min_pages && tokens + next > target {
                    break;
                }
                end += 1;
                tokens += next;
            }

            if end + 1 >= n {
                ranges.push((start, end));
                break;
            }

            // Step back by the overlap, but always move forward
            let next_start = (end + 1).saturating_sub(overlap).max(start + 1);

            // Absorb a tail too small to stand on its own
            if n - next_start <= overlap + min_pages {
                ranges.push((start, n - 1));
                break;
            }

            ranges.push((start, end));
            start = next_start;
        }

        ranges
    }
}

/// Plan chunks from explicit parameters instead of a `ChunkingConfig`
pub fn compute_chunks(
    pages: &[Page],
    max_tokens: usize,
    target_chunk_tokens: usize,
    overlap_pages: usize,
    min_chunk_pages: usize,
) -> ChunkingResult {
    DocumentChunker::new(ChunkingConfig {
        max_tokens,
        target_chunk_tokens,
        overlap_pages,
        min_chunk_pages,
    })
    .compute_chunks(pages)
}

pub fn page_marker(page_number: usize) -> String {
    format!("--- Page {} ---", page_number)
}

/// Text of the boundary's pages, each under a page marker, blank-line separated
pub fn get_chunk_text(pages: &[Page], boundary: &ChunkBoundary) -> String {
    pages
        .iter()
        .filter(|p| boundary.contains(p.page_number()))
        .map(|p| format!("{}\n{}", page_marker(p.page_number()), p.text()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::page::pages_from_texts;

    /// `count` pages of `tokens` estimated tokens each
    fn uniform_pages(count: usize, tokens: usize) -> Vec<Page> {
        pages_from_texts((0..count).map(|_| "x".repeat(tokens * 4)))
    }

    fn spans(result: &ChunkingResult) -> Vec<(usize, usize)> {
        result.chunks.iter().map(|c| (c.start_page, c.end_page)).collect()
    }

    fn assert_well_formed(result: &ChunkingResult) {
        let chunks = &result.chunks;
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].start_page, 1);
        assert_eq!(chunks.last().unwrap().end_page, result.total_pages);

        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert!(c.start_page <= c.end_page);
            assert_eq!(c.is_first, i == 0);
            assert_eq!(c.is_last, i == chunks.len() - 1);
        }

        for pair in chunks.windows(2) {
            assert!(pair[1].start_page > pair[0].start_page);
            // no gap between neighbours
            assert!(pair[1].start_page <= pair[0].end_page + 1);
        }

        for page in 1..=result.total_pages {
            assert!(chunks.iter().any(|c| c.contains(page)), "page {} uncovered", page);
        }
    }

    #[test]
    fn test_empty_input() {
        let result = compute_chunks(&[], 40_000, 30_000, 2, 3);
        assert_eq!(result.total_pages, 0);
        assert_eq!(result.total_tokens, 0);
        assert!(!result.chunking_required);
        assert!(result.chunks.is_empty());
        assert_eq!(result.strategy, ChunkStrategy::None);
    }

    #[test]
    fn test_under_threshold_single_chunk() {
        let pages = uniform_pages(8, 5_000);
        let result = compute_chunks(&pages, 40_000, 30_000, 2, 3);

        assert!(!result.chunking_required);
        assert_eq!(result.strategy, ChunkStrategy::None);
        assert_eq!(spans(&result), vec![(1, 8)]);
        assert!(result.chunks[0].is_first && result.chunks[0].is_last);
        assert_eq!(result.chunks[0].estimated_token_count, 40_000);
    }

    #[test]
    fn test_reference_example() {
        let pages = uniform_pages(10, 5_000);
        let result = compute_chunks(&pages, 40_000, 30_000, 2, 3);

        assert!(result.chunking_required);
        assert_eq!(result.strategy, ChunkStrategy::TokenBased);
        assert_eq!(result.total_tokens, 50_000);
        assert_eq!(spans(&result), vec![(1, 6), (5, 10)]);
        assert_eq!(result.chunks[0].estimated_token_count, 30_000);
        assert_eq!(result.chunks[1].estimated_token_count, 30_000);
        assert_eq!(result.target_chunk_tokens, 30_000);
        assert_eq!(result.overlap_pages, 2);
        assert_well_formed(&result);
    }

    #[test]
    fn test_no_overlap() {
        let pages = uniform_pages(10, 5_000);
        let result = compute_chunks(&pages, 40_000, 20_000, 0, 1);
        assert_eq!(spans(&result), vec![(1, 4), (5, 8), (9, 10)]);
        assert_well_formed(&result);
    }

    #[test]
    fn test_tail_merge() {
        let pages = uniform_pages(8, 5_000);
        let result = compute_chunks(&pages, 30_000, 20_000, 1, 2);

        assert_eq!(spans(&result), vec![(1, 4), (4, 8)]);
        assert_eq!(result.chunks[1].estimated_token_count, 25_000);
        assert_well_formed(&result);
    }

    #[test]
    fn test_oversized_page_still_progresses() {
        let pages = pages_from_texts(vec![
            "x".repeat(200_000), // 50,000 tokens
            "x".repeat(4_000),
            "x".repeat(4_000),
        ]);
        let result = compute_chunks(&pages, 40_000, 10_000, 0, 1);

        assert_eq!(spans(&result), vec![(1, 1), (2, 3)]);
        assert_eq!(result.chunks[0].estimated_token_count, 50_000);
        assert_well_formed(&result);
    }

    #[test]
    fn test_min_pages_overrides_target() {
        // 3-page minimum forces 30,000-token chunks past a 12,000 target
        let pages = uniform_pages(12, 10_000);
        let result = compute_chunks(&pages, 50_000, 12_000, 0, 3);

        assert_eq!(spans(&result), vec![(1, 3), (4, 6), (7, 12)]);
        assert_well_formed(&result);
    }

    #[test]
    fn test_large_overlap_forces_forward_progress() {
        let pages = uniform_pages(10, 5_000);
        let result = compute_chunks(&pages, 1, 10_000, 5, 1);

        assert_eq!(spans(&result), vec![(1, 2), (2, 3), (3, 4), (4, 10)]);
        assert_well_formed(&result);
    }

    #[test]
    fn test_zero_min_pages_treated_as_one() {
        let pages = uniform_pages(6, 5_000);
        let zero = compute_chunks(&pages, 10_000, 10_000, 0, 0);
        let one = compute_chunks(&pages, 10_000, 10_000, 0, 1);
        assert_eq!(zero.chunks, one.chunks);
    }

    #[test]
    fn test_well_formed_across_configurations() {
        let page_sizes = [1_000, 3_000, 7_500, 12_000];
        for &count in &[1usize, 2, 5, 13, 40] {
            let pages = pages_from_texts(
                (0..count).map(|i| "x".repeat(page_sizes[i % page_sizes.len()] * 4)),
            );
            for &target in &[1_000usize, 10_000, 30_000] {
                for &overlap in &[0usize, 1, 2, 6] {
                    for &min_pages in &[0usize, 1, 3] {
                        let result = compute_chunks(&pages, 0, target, overlap, min_pages);
                        assert_well_formed(&result);

                        let summed: usize = result
                            .chunks
                            .iter()
                            .map(|c| {
                                pages[c.start_page - 1..c.end_page]
                                    .iter()
                                    .map(Page::estimated_token_count)
                                    .sum::<usize>()
                            })
                            .sum();
                        let reported: usize =
                            result.chunks.iter().map(|c| c.estimated_token_count).sum();
                        assert_eq!(summed, reported);
                    }
                }
            }
        }
    }

    #[test]
    fn test_get_chunk_text() {
        let pages = pages_from_texts(["alpha", "beta", "gamma"]);
        let boundary = ChunkBoundary {
            chunk_index: 0,
            start_page: 2,
            end_page: 3,
            estimated_token_count: 2,
            is_first: true,
            is_last: true,
        };

        assert_eq!(
            get_chunk_text(&pages, &boundary),
            "--- Page 2 ---\nbeta\n\n--- Page 3 ---\ngamma"
        );
    }

    #[test]
    fn test_boundaries_use_page_numbers_of_slice() {
        // pages 11..=20 of a longer document
        let pages: Vec<Page> = (11..=20).map(|n| Page::new(n, "x".repeat(20_000))).collect();
        let result = compute_chunks(&pages, 40_000, 30_000, 2, 3);

        assert_eq!(spans(&result), vec![(11, 16), (15, 20)]);
        let texts: Vec<_> = result.chunk_texts(&pages).collect();
        assert!(texts[0].1.starts_with("--- Page 11 ---\n"));
        assert!(texts[1].1.starts_with("--- Page 15 ---\n"));
        assert_eq!(texts[1].1.matches("--- Page").count(), 6);

        let whole = compute_chunks(&pages, 100_000, 30_000, 2, 3);
        assert_eq!(spans(&whole), vec![(11, 20)]);
        assert_eq!(get_chunk_text(&pages, &whole.chunks[0]).matches("--- Page").count(), 10);
    }

    #[test]
    fn test_chunk_texts_pairs_every_boundary() {
        let pages = uniform_pages(10, 5_000);
        let result = compute_chunks(&pages, 40_000, 30_000, 2, 3);
        let texts: Vec<_> = result.chunk_texts(&pages).collect();

        assert_eq!(texts.len(), 2);
        assert!(texts[1].1.starts_with("--- Page 5 ---\n"));
        assert_eq!(texts[1].1.matches("--- Page").count(), 6);
    }

    #[test]
    fn test_strategy_serializes_snake_case() {
        let pages = uniform_pages(10, 5_000);
        let result = compute_chunks(&pages, 40_000, 30_000, 2, 3);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["strategy"], "token_based");
        assert_eq!(json["chunks"][0]["end_page"], 6);
        assert_eq!(json["chunks"][0]["estimated_token_count"], 30_000);

        let page = serde_json::to_value(&pages[0]).unwrap();
        assert_eq!(page["character_count"], 20_000);
        assert_eq!(page["estimated_token_count"], 5_000);
        assert_eq!(
            serde_json::to_value(ChunkStrategy::None).unwrap(),
            serde_json::json!("none")
        );
    }
}
