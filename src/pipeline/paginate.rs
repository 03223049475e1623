//! Pagination: group extracted blocks into line-bounded pages.
//!
//! Pages exist only so a user can pick which parts of a document to study;
//! they are unrelated to the source's physical pages. A page holds
//! consecutive blocks whose combined line count stays within the threshold.
//! A block that alone exceeds the threshold still gets exactly one page.

use crate::pipeline::extract::ExtractedBlock;
use serde::{Deserialize, Serialize};

/// A contiguous group of blocks, identified to the user by a 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number.
    pub index: usize,
    /// Blocks on this page, in document order. Never empty.
    pub blocks: Vec<ExtractedBlock>,
}

impl Page {
    /// The page's text: its blocks joined by line breaks.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Total lines across the page's blocks.
    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(|b| line_count(&b.text)).sum()
    }
}

/// Number of lines in a block: internal line breaks + 1.
pub fn line_count(text: &str) -> usize {
    text.matches('\n').count() + 1
}

/// Split `blocks` into pages of at most `lines_per_page` lines.
///
/// Concatenating every page's blocks in order yields `blocks` unchanged.
/// Zero blocks yield zero pages.
pub fn paginate(blocks: Vec<ExtractedBlock>, lines_per_page: usize) -> Vec<Page> {
    let mut pages: Vec<Page> = Vec::new();
    let mut current: Vec<ExtractedBlock> = Vec::new();
    let mut current_lines = 0usize;

    for block in blocks {
        let lines = line_count(&block.text);
        // An empty `current` means this block opens the page, however large.
        if !current.is_empty() && current_lines + lines > lines_per_page {
            pages.push(Page {
                index: pages.len() + 1,
                blocks: std::mem::take(&mut current),
            });
            current_lines = 0;
        }
        current_lines += lines;
        current.push(block);
    }

    if !current.is_empty() {
        pages.push(Page {
            index: pages.len() + 1,
            blocks: current,
        });
    }

    pages
}
