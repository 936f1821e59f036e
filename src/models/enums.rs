use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

// Codes follow FHIR `Timing.repeat.periodUnit` (UCUM).
str_enum!(PeriodUnit {
    Hour => "h",
    Day => "d",
    Week => "wk",
    Month => "mo",
});

str_enum!(MedicationType {
    Product => "product",
    Ingredient => "ingredient",
});

str_enum!(ScoringType {
    None => "none",
    Half => "half",
    Quarter => "quarter",
});

impl PeriodUnit {
    /// Parse loose English unit words ("weeks", "hrs", "day").
    pub fn from_word(word: &str) -> Option<Self> {
        match word.trim().to_lowercase().trim_end_matches('s') {
            "h" | "hr" | "hour" => Some(Self::Hour),
            "d" | "day" | "daily" => Some(Self::Day),
            "w" | "wk" | "week" | "weekly" => Some(Self::Week),
            "mo" | "month" | "monthly" => Some(Self::Month),
            _ => None,
        }
    }

    /// Singular English noun used in instruction text.
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl ScoringType {
    /// Smallest fraction of a tablet this scoring allows (1.0 = whole only).
    pub fn smallest_fraction(&self) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Half => 0.5,
            Self::Quarter => 0.25,
        }
    }
}

impl Default for MedicationType {
    fn default() -> Self {
        Self::Product
    }
}

impl Default for ScoringType {
    fn default() -> Self {
        Self::None
    }
}
