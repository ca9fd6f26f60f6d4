//! Activity labels, fall-type unification and causal PRE_FALL insertion.
//!
//! Raw recordings carry free-text activity codes (`WAL`, `STD`, `FOL`, ...).
//! [`LabelVocabulary`] normalizes them into [`Label`] values, folding every
//! fall type into [`Label::Fall`]. [`insert_pre_fall`] then derives the
//! synthetic PRE_FALL class from the fall onsets, and [`collapse`] reduces
//! everything to the three-class [`ClassLabel`] used for windows.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical text of the fall class.
pub const FALL: &str = "FALL";
/// Canonical text of the pre-fall class.
pub const PRE_FALL: &str = "PRE_FALL";
/// Canonical text of the normal-activity class.
pub const NON: &str = "NON";

/// Fall-type activity codes folded into [`FALL`] by default.
pub const DEFAULT_FALL_LABELS: [&str; 4] = ["FOL", "FKL", "BSC", "SDL"];

// ---------------------------------------------------------------------------
// Label
// ---------------------------------------------------------------------------

/// A per-sample label after vocabulary normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// Any non-fall activity, stored as its normalized text.
    Activity(String),
    /// A fall of any type.
    Fall,
    /// The synthetic interval preceding a fall onset.
    PreFall,
}

impl Label {
    /// `true` for [`Label::Fall`].
    pub fn is_fall(&self) -> bool {
        matches!(self, Label::Fall)
    }

    /// `true` for [`Label::PreFall`].
    pub fn is_pre_fall(&self) -> bool {
        matches!(self, Label::PreFall)
    }

    /// Normalized text of the label.
    pub fn as_str(&self) -> &str {
        match self {
            Label::Activity(s) => s,
            Label::Fall => FALL,
            Label::PreFall => PRE_FALL,
        }
    }

    /// Reduce to the three-class vocabulary.
    pub fn class(&self) -> ClassLabel {
        match self {
            Label::Fall => ClassLabel::Fall,
            Label::PreFall => ClassLabel::PreFall,
            Label::Activity(_) => ClassLabel::Non,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ClassLabel
// ---------------------------------------------------------------------------

/// The three window classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassLabel {
    /// Normal activity.
    #[serde(rename = "NON")]
    Non,
    /// The interval before a fall.
    #[serde(rename = "PRE_FALL")]
    PreFall,
    /// A fall.
    #[serde(rename = "FALL")]
    Fall,
}

impl ClassLabel {
    /// All classes in code order.
    pub const ALL: [ClassLabel; 3] = [ClassLabel::Non, ClassLabel::PreFall, ClassLabel::Fall];

    /// Canonical text of the class.
    pub fn as_str(self) -> &'static str {
        match self {
            ClassLabel::Non => NON,
            ClassLabel::PreFall => PRE_FALL,
            ClassLabel::Fall => FALL,
        }
    }

    /// Tie-break rank: higher wins.
    pub(crate) fn priority(self) -> u8 {
        match self {
            ClassLabel::Non => 0,
            ClassLabel::PreFall => 1,
            ClassLabel::Fall => 2,
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LabelMap
// ---------------------------------------------------------------------------

/// Integer codes written to `labels.npy`.
///
/// Serializes as `{"NON": 0, "PRE_FALL": 1, "FALL": 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap {
    /// Code of [`ClassLabel::Non`].
    #[serde(rename = "NON")]
    pub non: i64,
    /// Code of [`ClassLabel::PreFall`].
    #[serde(rename = "PRE_FALL")]
    pub pre_fall: i64,
    /// Code of [`ClassLabel::Fall`].
    #[serde(rename = "FALL")]
    pub fall: i64,
}

impl Default for LabelMap {
    fn default() -> Self {
        LabelMap { non: 0, pre_fall: 1, fall: 2 }
    }
}

impl LabelMap {
    /// Integer code of `class`.
    pub fn code(&self, class: ClassLabel) -> i64 {
        match class {
            ClassLabel::Non => self.non,
            ClassLabel::PreFall => self.pre_fall,
            ClassLabel::Fall => self.fall,
        }
    }

    /// Inverse of [`LabelMap::code`].
    pub fn decode(&self, code: i64) -> Option<ClassLabel> {
        ClassLabel::ALL.into_iter().find(|&c| self.code(c) == code)
    }

    /// `true` when the three codes are pairwise distinct.
    pub fn is_injective(&self) -> bool {
        self.non != self.pre_fall && self.non != self.fall && self.pre_fall != self.fall
    }
}

// ---------------------------------------------------------------------------
// LabelVocabulary
// ---------------------------------------------------------------------------

/// Parses raw label text into [`Label`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVocabulary {
    fall_labels: HashSet<String>,
}

impl Default for LabelVocabulary {
    fn default() -> Self {
        LabelVocabulary::new(DEFAULT_FALL_LABELS)
    }
}

impl LabelVocabulary {
    /// Vocabulary treating every entry of `fall_labels` (case-insensitive)
    /// as a fall type.
    pub fn new<I, S>(fall_labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fall_labels = fall_labels.into_iter().map(|s| normalize(s.as_ref())).collect();
        LabelVocabulary { fall_labels }
    }

    /// `true` when `raw` denotes a fall (a configured fall type or `FALL`).
    pub fn is_fall(&self, raw: &str) -> bool {
        let norm = normalize(raw);
        norm == FALL || self.fall_labels.contains(&norm)
    }

    /// Parse one raw label cell.
    pub fn parse(&self, raw: &str) -> Label {
        let norm = normalize(raw);
        if norm == FALL || self.fall_labels.contains(&norm) {
            Label::Fall
        } else if norm == PRE_FALL {
            Label::PreFall
        } else {
            Label::Activity(norm)
        }
    }

    /// Normalized text for a rewritten CSV cell: fall types become `FALL`,
    /// everything else is trimmed and upper-cased.
    pub fn unify_text(&self, raw: &str) -> String {
        self.parse(raw).as_str().to_owned()
    }
}

/// Trim and upper-case a raw label.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// ---------------------------------------------------------------------------
// Pre-fall insertion
// ---------------------------------------------------------------------------

/// Number of grid samples covering `pre_fall_seconds` at `rate_hz`.
pub fn pre_fall_samples(pre_fall_seconds: f64, rate_hz: f64) -> usize {
    (pre_fall_seconds * rate_hz).round().max(0.0) as usize
}

/// Indices `i >= 1` where a FALL run starts.
///
/// A FALL run beginning at index 0 has no observable transition and is not
/// an onset.
pub fn fall_onsets(labels: &[Label]) -> Vec<usize> {
    labels
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1].is_fall() && !pair[0].is_fall())
        .map(|(i, _)| i + 1)
        .collect()
}

/// Result of [`insert_pre_fall`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreFallInsertion {
    /// Fall onsets found before relabelling.
    pub onsets: Vec<usize>,
    /// Samples whose label changed to PRE_FALL.
    pub relabelled: usize,
}

/// Mark the `pre_fall_samples` samples before every fall onset as
/// [`Label::PreFall`].
///
/// Onsets are located on the input, then each span `[onset - n, onset)` is
/// overwritten in increasing order, including the tail of an earlier fall
/// that a close onset reaches back into. Nothing at or after an onset is
/// touched. Running the function on its own output changes nothing.
pub fn insert_pre_fall(labels: &mut [Label], pre_fall_samples: usize) -> PreFallInsertion {
    let onsets = fall_onsets(labels);
    let mut relabelled = 0;
    for &onset in &onsets {
        let start = onset.saturating_sub(pre_fall_samples);
        for label in &mut labels[start..onset] {
            if !label.is_pre_fall() {
                *label = Label::PreFall;
                relabelled += 1;
            }
        }
    }
    PreFallInsertion { onsets, relabelled }
}

/// Reduce every label to its [`ClassLabel`].
pub fn collapse(labels: &[Label]) -> Vec<ClassLabel> {
    labels.iter().map(Label::class).collect()
}

// ---------------------------------------------------------------------------
// ClassCounts
// ---------------------------------------------------------------------------

/// Per-class tallies of samples or windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    /// NON count.
    #[serde(rename = "NON")]
    pub non: usize,
    /// PRE_FALL count.
    #[serde(rename = "PRE_FALL")]
    pub pre_fall: usize,
    /// FALL count.
    #[serde(rename = "FALL")]
    pub fall: usize,
}

impl ClassCounts {
    /// Tally an iterator of class labels.
    pub fn tally<I: IntoIterator<Item = ClassLabel>>(labels: I) -> Self {
        let mut counts = ClassCounts::default();
        for l in labels {
            counts.add(l);
        }
        counts
    }

    /// Count one more `class`.
    pub fn add(&mut self, class: ClassLabel) {
        match class {
            ClassLabel::Non => self.non += 1,
            ClassLabel::PreFall => self.pre_fall += 1,
            ClassLabel::Fall => self.fall += 1,
        }
    }

    /// Count for `class`.
    pub fn get(&self, class: ClassLabel) -> usize {
        match class {
            ClassLabel::Non => self.non,
            ClassLabel::PreFall => self.pre_fall,
            ClassLabel::Fall => self.fall,
        }
    }

    /// Sum over all classes.
    pub fn total(&self) -> usize {
        self.non + self.pre_fall + self.fall
    }

    /// Element-wise sum.
    pub fn merge(&mut self, other: &ClassCounts) {
        self.non += other.non;
        self.pre_fall += other.pre_fall;
        self.fall += other.fall;
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NON={} PRE_FALL={} FALL={}", self.non, self.pre_fall, self.fall)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
