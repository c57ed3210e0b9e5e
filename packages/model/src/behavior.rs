use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Presentation hint drawn from a kind-specific allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Behavior {
    AutoAdvance,
    NoAutoAdvance,
    Repeat,
    NoRepeat,
    Unordered,
    Individuals,
    Continuous,
    Paged,
    FacingPages,
    NonPaged,
    MultiPart,
    Together,
    Sequence,
    ThumbnailNav,
    NoNav,
    Hidden,
}

use Behavior::*;

/// Groups whose members exclude each other pairwise
const EXCLUSIVE_GROUPS: &[&[Behavior]] = &[
    &[AutoAdvance, NoAutoAdvance],
    &[Repeat, NoRepeat],
    &[Unordered, Individuals, Continuous, Paged],
    &[FacingPages, NonPaged],
    &[MultiPart, Together],
    &[Sequence, ThumbnailNav, NoNav],
];

impl Behavior {
    pub const ALL: [Behavior; 16] = [
        AutoAdvance,
        NoAutoAdvance,
        Repeat,
        NoRepeat,
        Unordered,
        Individuals,
        Continuous,
        Paged,
        FacingPages,
        NonPaged,
        MultiPart,
        Together,
        Sequence,
        ThumbnailNav,
        NoNav,
        Hidden,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AutoAdvance => "auto-advance",
            NoAutoAdvance => "no-auto-advance",
            Repeat => "repeat",
            NoRepeat => "no-repeat",
            Unordered => "unordered",
            Individuals => "individuals",
            Continuous => "continuous",
            Paged => "paged",
            FacingPages => "facing-pages",
            NonPaged => "non-paged",
            MultiPart => "multi-part",
            Together => "together",
            Sequence => "sequence",
            ThumbnailNav => "thumbnail-nav",
            NoNav => "no-nav",
            Hidden => "hidden",
        }
    }

    /// Values legal on an entity of `kind`
    pub fn allowed_for(kind: EntityKind) -> &'static [Behavior] {
        match kind {
            EntityKind::Collection => &[
                AutoAdvance,
                NoAutoAdvance,
                Continuous,
                Individuals,
                MultiPart,
                NoRepeat,
                Paged,
                Repeat,
                Together,
                Unordered,
            ],
            EntityKind::Manifest => &[
                AutoAdvance,
                NoAutoAdvance,
                Continuous,
                Individuals,
                NoRepeat,
                Paged,
                Repeat,
                Unordered,
            ],
            EntityKind::Canvas => &[AutoAdvance, NoAutoAdvance, FacingPages, NonPaged],
            EntityKind::Range => &[
                AutoAdvance,
                NoAutoAdvance,
                Continuous,
                Individuals,
                NoNav,
                Paged,
                Sequence,
                ThumbnailNav,
                Unordered,
            ],
            EntityKind::AnnotationPage => &[],
            EntityKind::Annotation => &[Hidden],
        }
    }

    pub fn is_allowed_for(self, kind: EntityKind) -> bool {
        Self::allowed_for(kind).contains(&self)
    }

    pub fn conflicts_with(self, other: Behavior) -> bool {
        self != other
            && EXCLUSIVE_GROUPS
                .iter()
                .any(|group| group.contains(&self) && group.contains(&other))
    }

    /// First mutually exclusive pair in `values`, in input order
    pub fn find_conflict(values: &[Behavior]) -> Option<(Behavior, Behavior)> {
        values.iter().enumerate().find_map(|(i, a)| {
            values[i + 1..]
                .iter()
                .find(|b| a.conflicts_with(**b))
                .map(|b| (*a, *b))
        })
    }

    /// Whether a child of `child` kind inherits behavior from a `parent` kind
    pub fn inherits(parent: EntityKind, child: EntityKind) -> bool {
        matches!(
            (parent, child),
            (EntityKind::Collection, EntityKind::Collection)
                | (EntityKind::Collection, EntityKind::Manifest)
                | (EntityKind::Manifest, EntityKind::Range)
                | (EntityKind::Range, EntityKind::Range)
        )
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Behavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown behavior '{}'", s))
    }
}

/// Reading order of a multi-surface object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewingDirection {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl ViewingDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewingDirection::LeftToRight => "left-to-right",
            ViewingDirection::RightToLeft => "right-to-left",
            ViewingDirection::TopToBottom => "top-to-bottom",
            ViewingDirection::BottomToTop => "bottom-to-top",
        }
    }

    pub fn is_allowed_for(kind: EntityKind) -> bool {
        matches!(
            kind,
            EntityKind::Collection | EntityKind::Manifest | EntityKind::Range
        )
    }
}

impl FromStr for ViewingDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left-to-right" => Ok(ViewingDirection::LeftToRight),
            "right-to-left" => Ok(ViewingDirection::RightToLeft),
            "top-to-bottom" => Ok(ViewingDirection::TopToBottom),
            "bottom-to-top" => Ok(ViewingDirection::BottomToTop),
            other => Err(format!("unknown viewing direction '{}'", other)),
        }
    }
}

/// Why an annotation exists (W3C Web Annotation motivations)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Motivation {
    /// Primary content of the canvas
    Painting,
    Supplementing,
    Commenting,
    Tagging,
    Describing,
    Highlighting,
    Linking,
    Identifying,
    Classifying,
    Bookmarking,
    Editing,
    Moderating,
    Questioning,
    Replying,
    Assessing,
}

impl Motivation {
    pub fn as_str(self) -> &'static str {
        match self {
            Motivation::Painting => "painting",
            Motivation::Supplementing => "supplementing",
            Motivation::Commenting => "commenting",
            Motivation::Tagging => "tagging",
            Motivation::Describing => "describing",
            Motivation::Highlighting => "highlighting",
            Motivation::Linking => "linking",
            Motivation::Identifying => "identifying",
            Motivation::Classifying => "classifying",
            Motivation::Bookmarking => "bookmarking",
            Motivation::Editing => "editing",
            Motivation::Moderating => "moderating",
            Motivation::Questioning => "questioning",
            Motivation::Replying => "replying",
            Motivation::Assessing => "assessing",
        }
    }

    pub fn is_primary(self) -> bool {
        self == Motivation::Painting
    }
}

impl fmt::Display for Motivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusive_pairs() {
        assert!(Individuals.conflicts_with(Continuous));
        assert!(Paged.conflicts_with(Unordered));
        assert!(!Paged.conflicts_with(Paged));
        assert!(!AutoAdvance.conflicts_with(Repeat));
    }

    #[test]
    fn test_find_conflict_reports_input_order() {
        let values = [Repeat, Individuals, Continuous];
        assert_eq!(Behavior::find_conflict(&values), Some((Individuals, Continuous)));
        assert_eq!(Behavior::find_conflict(&[Continuous]), None);
    }

    #[test]
    fn test_allow_lists() {
        assert!(Paged.is_allowed_for(EntityKind::Manifest));
        assert!(!FacingPages.is_allowed_for(EntityKind::Manifest));
        assert!(FacingPages.is_allowed_for(EntityKind::Canvas));
        assert!(Behavior::allowed_for(EntityKind::AnnotationPage).is_empty());
    }

    #[test]
    fn test_parse_round_trips_wire_names() {
        for behavior in Behavior::ALL {
            assert_eq!(behavior.as_str().parse::<Behavior>(), Ok(behavior));
            let json = serde_json::to_value(behavior).unwrap();
            assert_eq!(json, serde_json::json!(behavior.as_str()));
        }
        assert!("sideways".parse::<Behavior>().is_err());
    }
}
