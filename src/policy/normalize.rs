use regex::Regex;
use std::sync::LazyLock;

static YEAR_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("year-month pattern"));

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern")
});

static TRACKING_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9-]+$").expect("tracking code pattern"));

static TRAILER_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2,}-\d+$").expect("trailer code pattern"));

/// Placeholder
///
/// The named placeholders a canonical path may end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Id,
    ShareId,
    TrailerId,
    Month,
}

impl Placeholder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placeholder::Id => ":id",
            Placeholder::ShareId => ":shareId",
            Placeholder::TrailerId => ":trailerId",
            Placeholder::Month => ":month",
        }
    }
}

/// SegmentPattern
///
/// The shapes a dynamic final segment can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentPattern {
    /// `2025-10`
    YearMonth,
    /// Hyphenated 8-4-4-4-12 hex, either case.
    Uuid,
    /// Uppercase letters, digits and dashes, as reported by tracking devices.
    TrackingCode,
    /// Fleet code such as `TRL-0042`.
    TrailerCode,
}

impl SegmentPattern {
    pub fn matches(&self, segment: &str) -> bool {
        match self {
            SegmentPattern::YearMonth => YEAR_MONTH.is_match(segment),
            SegmentPattern::Uuid => UUID.is_match(segment),
            SegmentPattern::TrackingCode => TRACKING_CODE.is_match(segment),
            SegmentPattern::TrailerCode => TRAILER_CODE.is_match(segment),
        }
    }
}

/// SegmentRule
///
/// Replaces the final segment with `placeholder` when it matches `pattern` and, if a
/// `scope` is set, one of the preceding segments equals that scope.
#[derive(Debug, Clone, Copy)]
pub struct SegmentRule {
    pub scope: Option<&'static str>,
    pub pattern: SegmentPattern,
    pub placeholder: Placeholder,
}

impl SegmentRule {
    fn applies(&self, parent: &str, last: &str) -> bool {
        let in_scope = match self.scope {
            Some(scope) => parent.split('/').any(|segment| segment == scope),
            None => true,
        };
        in_scope && self.pattern.matches(last)
    }
}

/// Evaluated top to bottom; the first applicable rule wins.
pub const SEGMENT_RULES: [SegmentRule; 5] = [
    SegmentRule {
        scope: Some("generate"),
        pattern: SegmentPattern::YearMonth,
        placeholder: Placeholder::Month,
    },
    SegmentRule {
        scope: Some("payments"),
        pattern: SegmentPattern::Uuid,
        placeholder: Placeholder::ShareId,
    },
    SegmentRule {
        scope: Some("tracking"),
        pattern: SegmentPattern::TrackingCode,
        placeholder: Placeholder::TrailerId,
    },
    SegmentRule {
        scope: None,
        pattern: SegmentPattern::Uuid,
        placeholder: Placeholder::Id,
    },
    SegmentRule {
        scope: None,
        pattern: SegmentPattern::TrailerCode,
        placeholder: Placeholder::TrailerId,
    },
];

/// NormalizedPath
///
/// A request path rewritten into its canonical form. When a placeholder was substituted,
/// the concrete segment it replaced is kept as `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub canonical: String,
    pub placeholder: Option<Placeholder>,
    pub resource_id: Option<String>,
}

/// normalize_path
///
/// Only the final segment is ever a candidate for replacement. Paths whose final
/// segment matches no rule are returned unchanged (static routes), which also makes the
/// function idempotent on canonical paths.
pub fn normalize_path(path: &str) -> NormalizedPath {
    let unchanged = || NormalizedPath {
        canonical: path.to_string(),
        placeholder: None,
        resource_id: None,
    };

    let Some((parent, last)) = path.rsplit_once('/') else {
        return unchanged();
    };

    match SEGMENT_RULES.iter().find(|rule| rule.applies(parent, last)) {
        Some(rule) => NormalizedPath {
            canonical: format!("{}/{}", parent, rule.placeholder.as_str()),
            placeholder: Some(rule.placeholder),
            resource_id: Some(last.to_string()),
        },
        None => unchanged(),
    }
}
