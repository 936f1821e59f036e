use serde::{Deserialize, Serialize};

use super::SignatureError;

pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// Administration route with its SNOMED CT code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Oral,
    Sublingual,
    Buccal,
    Nasal,
    Topical,
    Transdermal,
    Intramuscular,
    Subcutaneous,
    Intravenous,
    Ophthalmic,
    Otic,
    Inhalation,
    Rectal,
    Vaginal,
}

impl Route {
    pub fn snomed_code(&self) -> &'static str {
        match self {
            Self::Oral => "26643006",
            Self::Sublingual => "37839007",
            Self::Buccal => "54471007",
            Self::Nasal => "46713006",
            Self::Topical => "6064005",
            Self::Transdermal => "45890007",
            Self::Intramuscular => "78421000",
            Self::Subcutaneous => "34206005",
            Self::Intravenous => "47625008",
            Self::Ophthalmic => "54485002",
            Self::Otic => "10547007",
            Self::Inhalation => "447694001",
            Self::Rectal => "37161004",
            Self::Vaginal => "16857009",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Self::Oral => "Oral route",
            Self::Sublingual => "Sublingual route",
            Self::Buccal => "Buccal route",
            Self::Nasal => "Nasal route",
            Self::Topical => "Topical route",
            Self::Transdermal => "Transdermal route",
            Self::Intramuscular => "Intramuscular route",
            Self::Subcutaneous => "Subcutaneous route",
            Self::Intravenous => "Intravenous route",
            Self::Ophthalmic => "Ophthalmic route",
            Self::Otic => "Otic route",
            Self::Inhalation => "Respiratory tract route",
            Self::Rectal => "Per rectum",
            Self::Vaginal => "Per vagina",
        }
    }

    /// Instruction verb ("Take", "Inject").
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Oral => "Take",
            Self::Sublingual | Self::Buccal => "Place",
            Self::Nasal => "Use",
            Self::Topical | Self::Transdermal => "Apply",
            Self::Intramuscular | Self::Subcutaneous | Self::Intravenous => "Inject",
            Self::Ophthalmic | Self::Otic => "Instill",
            Self::Inhalation => "Inhale",
            Self::Rectal | Self::Vaginal => "Insert",
        }
    }

    /// Route phrase following the dose ("by mouth", "under the skin").
    pub fn phrase(&self) -> &'static str {
        match self {
            Self::Oral => "by mouth",
            Self::Sublingual => "under the tongue",
            Self::Buccal => "between the cheek and gum",
            Self::Nasal => "in the nose",
            Self::Topical => "to the affected area",
            Self::Transdermal => "to the skin",
            Self::Intramuscular => "into the muscle",
            Self::Subcutaneous => "under the skin",
            Self::Intravenous => "intravenously",
            Self::Ophthalmic => "in the eye",
            Self::Otic => "in the ear",
            Self::Inhalation => "by inhalation",
            Self::Rectal => "rectally",
            Self::Vaginal => "vaginally",
        }
    }

    /// Parse common route names and sig abbreviations ("po", "subq", "by mouth").
    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        let key = text.trim().trim_end_matches('.').to_lowercase();
        let route = match key.as_str() {
            "oral" | "orally" | "po" | "by mouth" | "mouth" => Self::Oral,
            "sublingual" | "sl" | "under the tongue" => Self::Sublingual,
            "buccal" => Self::Buccal,
            "nasal" | "intranasal" | "in the nose" | "each nostril" | "in each nostril" => {
                Self::Nasal
            }
            "topical" | "topically" | "top" | "to the affected area" => Self::Topical,
            "transdermal" | "td" => Self::Transdermal,
            "intramuscular" | "im" => Self::Intramuscular,
            "subcutaneous" | "subcutaneously" | "sc" | "sq" | "subq" | "under the skin" => {
                Self::Subcutaneous
            }
            "intravenous" | "intravenously" | "iv" => Self::Intravenous,
            "ophthalmic" | "eye" | "in the eye" => Self::Ophthalmic,
            "otic" | "ear" | "in the ear" => Self::Otic,
            "inhalation" | "inhaled" | "inh" | "by inhalation" => Self::Inhalation,
            "rectal" | "rectally" | "pr" => Self::Rectal,
            "vaginal" | "vaginally" | "pv" => Self::Vaginal,
            _ => return Err(SignatureError::UnknownRoute(text.trim().to_string())),
        };
        Ok(route)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display())
    }
}
