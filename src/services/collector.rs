use std::str::FromStr;

use crate::models::partner::{FilePolicy, Partner};
use crate::models::upload::{FileHandle, FileKind, UploadSelection};

/// Gather files for a partner and check them against its file policy.
///
/// Never performs I/O; a failed check means no request is made.
pub fn collect(partner: Partner, files: Vec<FileHandle>) -> Result<UploadSelection, ValidationError> {
    let selection = UploadSelection { partner, files };
    validate(&selection)?;
    Ok(selection)
}

/// Same as [`collect`] but starting from a user-typed partner name.
pub fn collect_named(partner: &str, files: Vec<FileHandle>) -> Result<UploadSelection, ValidationError> {
    collect(parse_partner(partner)?, files)
}

pub fn parse_partner(input: &str) -> Result<Partner, ValidationError> {
    Partner::from_str(input.trim()).map_err(|_| ValidationError::UnknownPartner {
        input: input.to_string(),
        suggestion: Partner::suggest(input),
    })
}

/// Check a selection against its partner's file policy.
pub fn validate(selection: &UploadSelection) -> Result<(), ValidationError> {
    let partner = selection.partner;
    let has_pdf = selection.has_kind(FileKind::Pdf);
    let has_sheet = selection.has_kind(FileKind::Spreadsheet);

    let missing = match partner.file_policy() {
        FilePolicy::NotYetSupported => return Err(ValidationError::Unsupported { partner }),
        FilePolicy::BothRequired if !(has_pdf && has_sheet) => Some(Requirement::PdfAndSpreadsheet),
        FilePolicy::PdfOnly if !has_pdf => Some(Requirement::Pdf),
        FilePolicy::SpreadsheetOnly if !has_sheet => Some(Requirement::Spreadsheet),
        _ => None,
    };

    match missing {
        Some(requirement) => Err(ValidationError::MissingFiles {
            partner,
            requirement,
        }),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    PdfAndSpreadsheet,
    Pdf,
    Spreadsheet,
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Requirement::PdfAndSpreadsheet => "at least one PDF and one Excel file",
            Requirement::Pdf => "at least one PDF file",
            Requirement::Spreadsheet => "at least one Excel file",
        })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} requires {requirement}.", .partner.label())]
    MissingFiles {
        partner: Partner,
        requirement: Requirement,
    },

    #[error("{} is not yet supported. Please choose another partner.", .partner.label())]
    Unsupported { partner: Partner },

    #[error("Unknown partner '{input}'.{}", .suggestion.map(|p| format!(" Did you mean '{p}'?")).unwrap_or_default())]
    UnknownPartner {
        input: String,
        suggestion: Option<Partner>,
    },
}
