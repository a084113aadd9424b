use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed catalog of worksheet categories. Records store the label, this enum
/// is what writes are checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "SAT Math")]
    SatMath,
    Algebra,
    Geometry,
    Calculus,
    Statistics,
    Trigonometry,
    #[serde(rename = "Pre-Algebra")]
    PreAlgebra,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::SatMath,
        Category::Algebra,
        Category::Geometry,
        Category::Calculus,
        Category::Statistics,
        Category::Trigonometry,
        Category::PreAlgebra,
        Category::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::SatMath => "SAT Math",
            Category::Algebra => "Algebra",
            Category::Geometry => "Geometry",
            Category::Calculus => "Calculus",
            Category::Statistics => "Statistics",
            Category::Trigonometry => "Trigonometry",
            Category::PreAlgebra => "Pre-Algebra",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.label() == s)
            .copied()
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .iter()
            .find(|d| d.label() == s)
            .copied()
            .ok_or_else(|| format!("unknown difficulty '{}'", s))
    }
}
