//! The in-memory newsletter document model
//!
//! A `Document` is the single source of truth for what the editor shows: an
//! ordered list of content blocks plus the brand kit and view mode. It is
//! owned exclusively by one editor session and mutated through a closed set
//! of typed operations, never through string-keyed deep assignment.

pub mod fingerprint;
pub mod history;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors from typed document mutations
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("no block with id {0}")]
    UnknownBlock(String),

    #[error("edit {edit} is not valid for a {kind:?} block")]
    UnsupportedEdit { kind: BlockKind, edit: &'static str },

    #[error("block index {0} out of range")]
    IndexOutOfRange(usize),
}

/// The fixed set of block variants the editor can render.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Image,
    Button,
    Divider,
    Social,
    Spacer,
}

/// Canvas position of a block.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single content block.
///
/// The `id` is stable across mutation; content, styles and position are
/// freely mutable. Content and styles use `BTreeMap` so serialization (and
/// therefore fingerprinting) is deterministic.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ContentBlock {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: BlockKind,

    pub content: BTreeMap<String, Value>,

    pub styles: BTreeMap<String, String>,

    pub position: Position,
}

impl ContentBlock {
    /// Create an empty block of the given kind with a fresh id.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            content: BTreeMap::new(),
            styles: BTreeMap::new(),
            position: Position::default(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.insert("text".into(), Value::String(text.into()));
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position { x, y };
        self
    }
}

/// Brand assets shared across the newsletter.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BrandKit {
    pub colors: Vec<String>,
    pub fonts: Vec<String>,
    pub logos: Vec<String>,
}

/// Which device width the editor is previewing.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

/// The editable newsletter state.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub blocks: Vec<ContentBlock>,
    pub brand_kit: BrandKit,
    pub view_mode: ViewMode,
}

/// The closed set of per-block mutations, dispatched over the block's kind.
#[derive(Clone, Debug)]
pub enum BlockEdit {
    /// Text or Button body text.
    SetText(String),
    /// Text font size in points.
    SetFontSize(u32),
    /// Foreground color (Text, Button, Divider).
    SetColor(String),
    /// Image source and optional alt text.
    SetImageSource { src: String, alt: Option<String> },
    /// Target URL (Button, Social, Image).
    SetLinkUrl(String),
    /// Social platform list.
    SetPlatforms(Vec<String>),
    /// Spacer height in pixels.
    SetHeight(u32),
    /// Divider line thickness in pixels.
    SetThickness(u32),
    /// A CSS-ish style property; valid for every kind.
    SetStyle(String, String),
    /// Canvas position; valid for every kind.
    SetPosition(Position),
}

impl BlockEdit {
    fn name(&self) -> &'static str {
        match self {
            BlockEdit::SetText(_) => "SetText",
            BlockEdit::SetFontSize(_) => "SetFontSize",
            BlockEdit::SetColor(_) => "SetColor",
            BlockEdit::SetImageSource { .. } => "SetImageSource",
            BlockEdit::SetLinkUrl(_) => "SetLinkUrl",
            BlockEdit::SetPlatforms(_) => "SetPlatforms",
            BlockEdit::SetHeight(_) => "SetHeight",
            BlockEdit::SetThickness(_) => "SetThickness",
            BlockEdit::SetStyle(..) => "SetStyle",
            BlockEdit::SetPosition(_) => "SetPosition",
        }
    }
}

impl Document {
    /// Create an empty document with default brand kit and desktop view.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn block(&self, id: &str) -> Option<&ContentBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    fn block_mut(&mut self, id: &str) -> Result<&mut ContentBlock, DocumentError> {
        self.blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| DocumentError::UnknownBlock(id.to_string()))
    }

    /// Append a block to the document.
    pub fn insert_block(&mut self, block: ContentBlock) {
        self.blocks.push(block);
    }

    /// Remove a block by id, returning it.
    pub fn remove_block(&mut self, id: &str) -> Result<ContentBlock, DocumentError> {
        let index = self
            .blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| DocumentError::UnknownBlock(id.to_string()))?;
        Ok(self.blocks.remove(index))
    }

    /// Duplicate a block: same content and styles, fresh id, offset position.
    /// Returns the new block's id.
    pub fn duplicate_block(&mut self, id: &str) -> Result<String, DocumentError> {
        let source = self
            .block(id)
            .ok_or_else(|| DocumentError::UnknownBlock(id.to_string()))?;

        let mut copy = source.clone();
        copy.id = Uuid::new_v4().to_string();
        copy.position = Position {
            x: source.position.x + 20.0,
            y: source.position.y + 20.0,
        };

        let new_id = copy.id.clone();
        self.blocks.push(copy);
        Ok(new_id)
    }

    /// Move the block at `from` to index `to`, shifting the others.
    pub fn reorder_blocks(&mut self, from: usize, to: usize) -> Result<(), DocumentError> {
        if from >= self.blocks.len() {
            return Err(DocumentError::IndexOutOfRange(from));
        }
        if to >= self.blocks.len() {
            return Err(DocumentError::IndexOutOfRange(to));
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        Ok(())
    }

    /// Apply a typed edit to a block, validating it against the block's kind.
    pub fn edit_block(&mut self, id: &str, edit: BlockEdit) -> Result<(), DocumentError> {
        let block = self.block_mut(id)?;
        let kind = block.kind;

        let unsupported = |edit: &BlockEdit| DocumentError::UnsupportedEdit {
            kind,
            edit: edit.name(),
        };

        match &edit {
            BlockEdit::SetText(text) => match kind {
                BlockKind::Text | BlockKind::Button => {
                    block
                        .content
                        .insert("text".into(), Value::String(text.clone()));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetFontSize(size) => match kind {
                BlockKind::Text => {
                    block.content.insert("fontSize".into(), Value::from(*size));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetColor(color) => match kind {
                BlockKind::Text | BlockKind::Button | BlockKind::Divider => {
                    block
                        .content
                        .insert("color".into(), Value::String(color.clone()));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetImageSource { src, alt } => match kind {
                BlockKind::Image => {
                    block
                        .content
                        .insert("src".into(), Value::String(src.clone()));
                    if let Some(alt) = alt {
                        block
                            .content
                            .insert("alt".into(), Value::String(alt.clone()));
                    }
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetLinkUrl(url) => match kind {
                BlockKind::Button | BlockKind::Social | BlockKind::Image => {
                    block
                        .content
                        .insert("url".into(), Value::String(url.clone()));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetPlatforms(platforms) => match kind {
                BlockKind::Social => {
                    let list = platforms
                        .iter()
                        .map(|p| Value::String(p.clone()))
                        .collect::<Vec<_>>();
                    block.content.insert("platforms".into(), Value::Array(list));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetHeight(height) => match kind {
                BlockKind::Spacer => {
                    block.content.insert("height".into(), Value::from(*height));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetThickness(thickness) => match kind {
                BlockKind::Divider => {
                    block
                        .content
                        .insert("thickness".into(), Value::from(*thickness));
                }
                _ => return Err(unsupported(&edit)),
            },
            BlockEdit::SetStyle(key, value) => {
                block.styles.insert(key.clone(), value.clone());
            }
            BlockEdit::SetPosition(position) => {
                block.position = *position;
            }
        }

        Ok(())
    }

    pub fn set_brand_kit(&mut self, brand_kit: BrandKit) {
        self.brand_kit = brand_kit;
    }

    pub fn set_view_mode(&mut self, view_mode: ViewMode) {
        self.view_mode = view_mode;
    }
}
