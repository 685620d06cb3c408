//! Dirty-state detection against the last-persisted baseline
//!
//! Compares the current document fingerprint to the baseline recorded at the
//! last confirmed save. The detector never updates the baseline itself; only
//! the save path commits one, and only for the exact payload it transmitted.

use log::debug;

use crate::document::fingerprint::Fingerprint;
use crate::document::Document;

/// Result of a change evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Evaluation {
    pub dirty: bool,
    /// Whether the dirty flag flipped on this evaluation. The autosave timer
    /// is armed only on a clean-to-dirty transition.
    pub transitioned: bool,
}

#[derive(Debug, Default)]
pub struct ChangeDetector {
    baseline: Option<Fingerprint>,
    dirty: bool,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the document against the baseline.
    ///
    /// An empty document is never dirty, whatever happened to the brand kit
    /// or view mode; content-less drafts must not schedule saves. A document
    /// that gained its first block before any save exists is dirty even
    /// though there is no baseline to compare against.
    pub fn evaluate(&mut self, document: &Document) -> Evaluation {
        let dirty = if document.is_empty() {
            false
        } else {
            match &self.baseline {
                None => true,
                Some(baseline) => Fingerprint::compute(document) != *baseline,
            }
        };

        let transitioned = dirty != self.dirty;
        if transitioned {
            debug!(
                "change detector: {} -> {}",
                if self.dirty { "dirty" } else { "clean" },
                if dirty { "dirty" } else { "clean" }
            );
        }
        self.dirty = dirty;

        Evaluation { dirty, transitioned }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record the fingerprint of a successfully persisted payload.
    ///
    /// Called only by the save path, and only with the fingerprint captured
    /// when the payload was snapshotted, never a fresh fingerprint of the
    /// possibly further-mutated live document.
    pub fn commit_baseline(&mut self, fingerprint: Fingerprint) {
        self.baseline = Some(fingerprint);
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockEdit, BlockKind, BrandKit, ContentBlock, ViewMode};

    #[test]
    fn test_empty_document_is_never_dirty() {
        let mut detector = ChangeDetector::new();
        let mut doc = Document::new();

        assert!(!detector.evaluate(&doc).dirty);

        // Brand kit and view mode edits on an empty document stay clean
        doc.set_brand_kit(BrandKit {
            colors: vec!["#ff0000".into()],
            ..BrandKit::default()
        });
        doc.set_view_mode(ViewMode::Mobile);
        let eval = detector.evaluate(&doc);
        assert!(!eval.dirty);
        assert!(!eval.transitioned);
    }

    #[test]
    fn test_first_block_without_baseline_is_dirty_once() {
        let mut detector = ChangeDetector::new();
        let mut doc = Document::new();
        detector.evaluate(&doc);

        doc.insert_block(ContentBlock::new(BlockKind::Text).with_text("hi"));

        let first = detector.evaluate(&doc);
        assert!(first.dirty);
        assert!(first.transitioned);

        // Still dirty on re-evaluation, but no new transition
        let second = detector.evaluate(&doc);
        assert!(second.dirty);
        assert!(!second.transitioned);
    }

    #[test]
    fn test_baseline_commit_makes_clean_until_next_edit() {
        let mut detector = ChangeDetector::new();
        let mut doc = Document::new();
        doc.insert_block(ContentBlock::new(BlockKind::Text).with_text("hi"));
        detector.evaluate(&doc);

        detector.commit_baseline(Fingerprint::compute(&doc));
        let eval = detector.evaluate(&doc);
        assert!(!eval.dirty);
        assert!(eval.transitioned);

        let id = doc.blocks[0].id.clone();
        doc.edit_block(&id, BlockEdit::SetText("changed".into()))
            .unwrap();
        let eval = detector.evaluate(&doc);
        assert!(eval.dirty);
        assert!(eval.transitioned);
    }

    #[test]
    fn test_stale_baseline_reports_dirty() {
        // The baseline is the transmitted snapshot; a document mutated while
        // the save was in flight must evaluate dirty afterwards.
        let mut detector = ChangeDetector::new();
        let mut doc = Document::new();
        doc.insert_block(ContentBlock::new(BlockKind::Text).with_text("sent"));

        let sent = Fingerprint::compute(&doc);

        let id = doc.blocks[0].id.clone();
        doc.edit_block(&id, BlockEdit::SetText("mutated in flight".into()))
            .unwrap();

        detector.commit_baseline(sent);
        assert!(detector.evaluate(&doc).dirty);
    }
}
