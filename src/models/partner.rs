use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Minimum similarity for an unknown partner name to get a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Logistics partners whose invoices can be reconciled.
///
/// The `Display`/wire form is the identifier the backend expects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Partner {
    Brenger,
    Wuunder,
    #[serde(alias = "libero_logistics")]
    #[strum(to_string = "libero", serialize = "libero_logistics")]
    Libero,
    Swdevries,
    MagicMovers,
    Transpoksi,
    Tadde,
}

/// Which invoice files a partner's parser needs before a job can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePolicy {
    /// At least one PDF and at least one spreadsheet.
    BothRequired,
    PdfOnly,
    SpreadsheetOnly,
    /// No backend parser exists yet.
    NotYetSupported,
}

const PARTNER_POLICIES: &[(Partner, FilePolicy)] = &[
    (Partner::Brenger, FilePolicy::PdfOnly),
    (Partner::Wuunder, FilePolicy::PdfOnly),
    (Partner::Transpoksi, FilePolicy::PdfOnly),
    (Partner::Libero, FilePolicy::BothRequired),
    (Partner::Swdevries, FilePolicy::SpreadsheetOnly),
    (Partner::MagicMovers, FilePolicy::SpreadsheetOnly),
    (Partner::Tadde, FilePolicy::NotYetSupported),
];

impl Partner {
    /// File policy from the partner table. Partners missing from the table
    /// are treated as not yet supported.
    pub fn file_policy(self) -> FilePolicy {
        PARTNER_POLICIES
            .iter()
            .find(|(partner, _)| *partner == self)
            .map(|(_, policy)| *policy)
            .unwrap_or(FilePolicy::NotYetSupported)
    }

    /// Human-facing name used in messages.
    pub fn label(self) -> &'static str {
        match self {
            Partner::Brenger => "Brenger",
            Partner::Wuunder => "Wuunder",
            Partner::Libero => "Libero",
            Partner::Swdevries => "SwDeVries",
            Partner::MagicMovers => "MagicMovers",
            Partner::Transpoksi => "Transpoksi",
            Partner::Tadde => "Tadde",
        }
    }

    /// Closest known partner identifier for a mistyped name.
    pub fn suggest(input: &str) -> Option<Partner> {
        let needle = input.trim().to_lowercase();
        Partner::iter()
            .map(|p| (p, jaro_winkler(&needle, p.as_ref())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }
}
