//! Merge policies applied during import.
//!
//! The canonical forms are explicit tagged records. The legacy 3-letter
//! mode codes (`"kcl"`, `"ncu"`, ...) and the comment-mode words are
//! accepted as compatibility input only, translated here at the boundary
//! with upfront validation: a malformed code fails before any store
//! mutation happens.

use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What happens to extras keys present only on the existing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetainUnmatched {
    Keep,
    Discard,
}

/// What happens to extras keys present only in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddNew {
    Create,
    Skip,
}

/// What happens to extras keys present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnCollision {
    Leave,
    Update,
    Delete,
}

/// Per-field conflict resolution for the extras of an entity that already
/// exists in the target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtrasMergePolicy {
    pub retain_unmatched: RetainUnmatched,
    pub add_new: AddNew,
    pub on_collision: OnCollision,
}

impl ExtrasMergePolicy {
    /// Preset: keep everything already there, add what is new (`"kcl"`).
    #[must_use]
    pub const fn keep_existing() -> Self {
        Self {
            retain_unmatched: RetainUnmatched::Keep,
            add_new: AddNew::Create,
            on_collision: OnCollision::Leave,
        }
    }

    /// Preset: like `keep_existing` but archive values win collisions
    /// (`"kcu"`).
    #[must_use]
    pub const fn update_existing() -> Self {
        Self {
            retain_unmatched: RetainUnmatched::Keep,
            add_new: AddNew::Create,
            on_collision: OnCollision::Update,
        }
    }

    /// Preset: make the extras exactly match the archive (`"ncu"`).
    #[must_use]
    pub const fn mirror() -> Self {
        Self {
            retain_unmatched: RetainUnmatched::Discard,
            add_new: AddNew::Create,
            on_collision: OnCollision::Update,
        }
    }

    /// Preset: leave existing extras completely untouched (`"knl"`).
    #[must_use]
    pub const fn none() -> Self {
        Self {
            retain_unmatched: RetainUnmatched::Keep,
            add_new: AddNew::Skip,
            on_collision: OnCollision::Leave,
        }
    }

    /// Parses a legacy 3-letter mode code.
    ///
    /// Position 1 is drawn from `[kn]` (keep/discard unmatched existing
    /// keys), position 2 from `[cn]` (create/skip new keys), position 3
    /// from `[lud]` (leave/update/delete collisions).
    pub fn parse(code: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidMergePolicy(code.to_string());
        let mut chars = code.chars();
        let (first, second, third) = match (chars.next(), chars.next(), chars.next(), chars.next())
        {
            (Some(a), Some(b), Some(c), None) => (a, b, c),
            _ => return Err(invalid()),
        };
        let retain_unmatched = match first {
            'k' => RetainUnmatched::Keep,
            'n' => RetainUnmatched::Discard,
            _ => return Err(invalid()),
        };
        let add_new = match second {
            'c' => AddNew::Create,
            'n' => AddNew::Skip,
            _ => return Err(invalid()),
        };
        let on_collision = match third {
            'l' => OnCollision::Leave,
            'u' => OnCollision::Update,
            'd' => OnCollision::Delete,
            _ => return Err(invalid()),
        };
        Ok(Self {
            retain_unmatched,
            add_new,
            on_collision,
        })
    }
}

impl FromStr for ExtrasMergePolicy {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether a node that does not yet exist in the target store gets the
/// archive's extras attached on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrasModeNew {
    Import,
    None,
}

impl ExtrasModeNew {
    pub fn parse(mode: &str) -> Result<Self, ModelError> {
        match mode {
            "import" => Ok(Self::Import),
            "none" => Ok(Self::None),
            _ => Err(ModelError::InvalidExtrasMode(mode.to_string())),
        }
    }
}

impl FromStr for ExtrasModeNew {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Conflict resolution for a comment that exists on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentMergeMode {
    /// Keep the existing comment verbatim.
    Leave,
    /// Keep whichever of the two has the later modification time.
    Newest,
    /// Always take content and modification time from the archive.
    Overwrite,
}

impl CommentMergeMode {
    pub fn parse(mode: &str) -> Result<Self, ModelError> {
        match mode {
            "leave" => Ok(Self::Leave),
            "newest" => Ok(Self::Newest),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(ModelError::InvalidCommentMode(mode.to_string())),
        }
    }
}

impl FromStr for CommentMergeMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
