//! Letter grades and the ordered tables that define them.
//!
//! The percentile buckets, the grade/score conversions, and the report
//! ordering are all expressed as explicit ordered tables so the
//! contiguous-and-exhaustive invariants can be checked mechanically.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

/// A letter grade assigned to a project for one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    /// Top decile of the ratio distribution.
    APlus,
    /// 80th to 90th percentile.
    A,
    /// 60th to 80th percentile.
    B,
    /// 40th to 60th percentile.
    C,
    /// 20th to 40th percentile.
    D,
    /// 10th to 20th percentile.
    E,
    /// Bottom decile.
    F,
}

/// Percentile buckets, best grade first. A percentile belongs to the first
/// entry whose lower bound it reaches; the final 0.0 bound makes the table
/// exhaustive over [0, 100].
pub const PERCENTILE_BUCKETS: [(f64, Grade); 7] = [
    (90.0, Grade::APlus),
    (80.0, Grade::A),
    (60.0, Grade::B),
    (40.0, Grade::C),
    (20.0, Grade::D),
    (10.0, Grade::E),
    (0.0, Grade::F),
];

/// Numeric score per grade, used for severity-weighted averaging.
pub const GRADE_SCORES: [(Grade, u32); 7] = [
    (Grade::APlus, 6),
    (Grade::A, 5),
    (Grade::B, 4),
    (Grade::C, 3),
    (Grade::D, 2),
    (Grade::E, 1),
    (Grade::F, 0),
];

/// Score boundaries for converting a weighted average back to a letter.
/// Averages below every bound map to F.
pub const SCORE_BOUNDARIES: [(f64, Grade); 6] = [
    (5.5, Grade::APlus),
    (4.5, Grade::A),
    (3.5, Grade::B),
    (2.5, Grade::C),
    (1.5, Grade::D),
    (0.5, Grade::E),
];

/// Report ordering for grades, best first. This is a rank table, not a
/// string comparison: "A+" must sort before "A", and "A+" before "B".
pub const REPORT_RANK: [Grade; 7] = [
    Grade::APlus,
    Grade::A,
    Grade::B,
    Grade::C,
    Grade::D,
    Grade::E,
    Grade::F,
];

impl Grade {
    /// Grade for a percentile rank in [0, 100].
    pub fn for_percentile(percentile: f64) -> Self {
        for (bound, grade) in PERCENTILE_BUCKETS {
            if percentile >= bound {
                return grade;
            }
        }
        Grade::F
    }

    /// Grade for a severity-weighted average score.
    pub fn from_score(score: f64) -> Self {
        for (bound, grade) in SCORE_BOUNDARIES {
            if score >= bound {
                return grade;
            }
        }
        Grade::F
    }

    /// Numeric score used in weighted averaging (F=0 up to A+=6).
    pub fn score(self) -> u32 {
        for (grade, score) in GRADE_SCORES {
            if grade == self {
                return score;
            }
        }
        0
    }

    /// Position in the report ordering; lower ranks sort first.
    pub fn rank(self) -> usize {
        REPORT_RANK
            .iter()
            .position(|grade| *grade == self)
            .unwrap_or(REPORT_RANK.len())
    }

    /// Canonical letter used in persisted reports.
    pub fn letter(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        }
    }

    /// Parse a canonical letter back into a grade.
    pub fn from_letter(letter: &str) -> Option<Self> {
        REPORT_RANK
            .into_iter()
            .find(|grade| grade.letter() == letter)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.letter())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.letter())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let letter = String::deserialize(deserializer)?;
        Grade::from_letter(&letter)
            .ok_or_else(|| de::Error::custom(format!("unknown grade letter: {letter}")))
    }
}

/// Overall grade of a combined, multi-rule result. A zero total severity
/// makes the weighted average undefined and is reported as `N/A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallGrade {
    /// A weighted average mapped back to a letter.
    Graded(Grade),
    /// No rule carried any weight.
    NotApplicable,
}

impl OverallGrade {
    /// Canonical string used in persisted reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Graded(grade) => grade.letter(),
            Self::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for OverallGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OverallGrade {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OverallGrade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        if value == "N/A" {
            return Ok(Self::NotApplicable);
        }
        Grade::from_letter(&value)
            .map(Self::Graded)
            .ok_or_else(|| de::Error::custom(format!("unknown overall grade: {value}")))
    }
}
