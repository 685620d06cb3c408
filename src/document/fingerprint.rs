//! Content fingerprinting for change detection
//!
//! A fingerprint is a SHA-256 digest of the document's canonical JSON form.
//! It is opaque and used only for equality comparison against the baseline
//! recorded at the last successful save; it is never decoded.

use sha2::{Digest, Sha256};

use super::Document;

/// An opaque, deterministic digest of a serialized document.
///
/// Deep-equal documents always produce equal fingerprints, and block order
/// matters: the same blocks in a different order are a different fingerprint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Compute the fingerprint of a document.
    ///
    /// Content and style maps are `BTreeMap`, so serialization order is
    /// stable and this is a pure function of the document's value.
    pub fn compute(document: &Document) -> Fingerprint {
        // The document model contains only string-keyed maps and JSON-native
        // values, so serialization cannot fail.
        let bytes = serde_json::to_vec(document)
            .expect("document model serializes to JSON");
        let digest = Sha256::digest(&bytes);
        Fingerprint(digest.into())
    }

    /// Hex form, for logging only.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockEdit, BlockKind, ContentBlock, Document, ViewMode};

    fn two_block_doc() -> Document {
        let mut doc = Document::new();
        doc.insert_block(ContentBlock::new(BlockKind::Text).with_text("first"));
        doc.insert_block(ContentBlock::new(BlockKind::Image));
        doc
    }

    #[test]
    fn test_equal_documents_equal_fingerprints() {
        let doc = two_block_doc();
        let clone = doc.clone();

        assert_eq!(Fingerprint::compute(&doc), Fingerprint::compute(&doc));
        assert_eq!(Fingerprint::compute(&doc), Fingerprint::compute(&clone));
        assert_eq!(Fingerprint::compute(&doc).to_hex().len(), 64);
    }

    #[test]
    fn test_content_change_changes_fingerprint() {
        let mut doc = two_block_doc();
        let before = Fingerprint::compute(&doc);

        let id = doc.blocks[0].id.clone();
        doc.edit_block(&id, BlockEdit::SetText("edited".into()))
            .unwrap();

        assert_ne!(before, Fingerprint::compute(&doc));
    }

    #[test]
    fn test_block_order_is_significant() {
        let mut doc = two_block_doc();
        let before = Fingerprint::compute(&doc);

        doc.reorder_blocks(0, 1).unwrap();
        assert_ne!(before, Fingerprint::compute(&doc));

        // Reordering back restores the original fingerprint
        doc.reorder_blocks(1, 0).unwrap();
        assert_eq!(before, Fingerprint::compute(&doc));
    }

    #[test]
    fn test_view_mode_changes_fingerprint() {
        let mut doc = two_block_doc();
        let before = Fingerprint::compute(&doc);

        doc.set_view_mode(ViewMode::Mobile);
        assert_ne!(before, Fingerprint::compute(&doc));
    }
}
