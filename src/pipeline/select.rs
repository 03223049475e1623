//! Selection: turn the user's chosen pages back into generator input.
//!
//! The same rule applies to every format: each selected page contributes its
//! blocks joined by line breaks, and pages are concatenated back to back in
//! the order the user listed them, with nothing inserted between them.

use crate::config::PageSelection;
use crate::error::Doc2StudyError;
use crate::pipeline::paginate::Page;

/// Concatenate the text of the selected pages.
///
/// # Errors
/// [`Doc2StudyError::InvalidPageSelection`] if any index is 0 or beyond the
/// last page, or if the selection is empty.
pub fn resolve(pages: &[Page], selection: &PageSelection) -> Result<String, Doc2StudyError> {
    let numbers = selection.to_page_numbers(pages.len())?;
    Ok(concat_pages(pages, &numbers))
}

/// Concatenate pages by already-validated 1-based number.
pub(crate) fn concat_pages(pages: &[Page], numbers: &[usize]) -> String {
    numbers
        .iter()
        .map(|&n| pages[n - 1].text())
        .collect::<Vec<_>>()
        .concat()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::ExtractedBlock;
    use crate::pipeline::paginate::paginate;

    fn two_pages() -> Vec<Page> {
        let blocks = vec![
            ExtractedBlock::new(0, "alpha"),
            ExtractedBlock::new(1, "beta"),
            ExtractedBlock::new(2, "gamma"),
        ];
        let pages = paginate(blocks, 2);
        assert_eq!(pages.len(), 2);
        pages
    }

    #[test]
    fn blocks_within_a_page_are_joined_by_newline() {
        let text = resolve(&two_pages(), &PageSelection::Single(1)).unwrap();
        assert_eq!(text, "alpha\nbeta");
    }

    #[test]
    fn pages_follow_caller_order_without_separator() {
        let text = resolve(&two_pages(), &PageSelection::List(vec![2, 1])).unwrap();
        assert_eq!(text, "gammaalpha\nbeta");
    }

    #[test]
    fn index_zero_is_invalid() {
        let err = resolve(&two_pages(), &PageSelection::List(vec![0])).unwrap_err();
        assert!(matches!(
            err,
            Doc2StudyError::InvalidPageSelection { page: 0, total: 2 }
        ));
    }

    #[test]
    fn index_past_last_page_is_invalid() {
        let err = resolve(&two_pages(), &PageSelection::List(vec![1, 3])).unwrap_err();
        assert!(matches!(
            err,
            Doc2StudyError::InvalidPageSelection { page: 3, total: 2 }
        ));
    }

    #[test]
    fn all_pages_in_document_order() {
        let text = resolve(&two_pages(), &PageSelection::All).unwrap();
        assert_eq!(text, "alpha\nbetagamma");
    }
}
