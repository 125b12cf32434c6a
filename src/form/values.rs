//! Registration field set and its values.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::UploadLimits;
use crate::error::ValidationError;

/// A registration form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    CompanyName,
    AreaOfService,
    FullName,
    Email,
    Phone,
    Documents,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::CompanyName,
        Field::AreaOfService,
        Field::FullName,
        Field::Email,
        Field::Phone,
        Field::Documents,
    ];

    /// Field name as used by the form and the dialogue.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CompanyName => "companyName",
            Self::AreaOfService => "areaOfService",
            Self::FullName => "fullName",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Documents => "documents",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CompanyName => "Company Name",
            Self::AreaOfService => "Area of Service",
            Self::FullName => "Full Name",
            Self::Email => "Email",
            Self::Phone => "Phone Number",
            Self::Documents => "Documents",
        }
    }

    /// Multipart part name on `/api/v1/register`.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::CompanyName => "company_name",
            Self::AreaOfService => "area_of_service",
            Self::FullName => "applicant[full_name]",
            Self::Email => "applicant[email]",
            Self::Phone => "applicant[phone]",
            Self::Documents => "files",
        }
    }

    /// The documents field holds files; every other field holds text.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Documents)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Field {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "companyname" | "company" => Ok(Self::CompanyName),
            "areaofservice" | "area" => Ok(Self::AreaOfService),
            "fullname" | "name" => Ok(Self::FullName),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "documents" | "files" => Ok(Self::Documents),
            _ => Err(ValidationError::Invalid {
                field: s.trim().to_string(),
                message: format!("Unknown field: {}", s.trim()),
            }),
        }
    }
}

/// A file picked for upload, held in memory until submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedFile {
    pub file_name: String,
    pub content_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl SelectedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ValidationError::Unreadable {
                name: file_name.clone(),
                reason: e.to_string(),
            })?;
        let content_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();
        Ok(Self {
            file_name,
            content_type,
            data,
        })
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Check a document selection against the upload limits.
pub fn check_documents(limits: &UploadLimits, files: &[SelectedFile]) -> Result<(), ValidationError> {
    if files.len() > limits.max_files {
        return Err(ValidationError::TooManyFiles {
            count: files.len(),
            max: limits.max_files,
        });
    }
    for file in files {
        if file.size() > limits.max_file_size {
            return Err(ValidationError::FileTooLarge {
                name: file.file_name.clone(),
                size: file.size(),
                max: limits.max_file_size,
            });
        }
        if !limits.allows_type(&file.content_type) {
            return Err(ValidationError::UnsupportedFileType {
                name: file.file_name.clone(),
                content_type: file.content_type.clone(),
            });
        }
    }
    Ok(())
}

/// Borrowed view of one field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Files(&'a [SelectedFile]),
}

/// Current answers for the whole registration.
///
/// Every field is always present; the initial value is empty text or an
/// empty file list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormValues {
    pub company_name: String,
    pub area_of_service: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub documents: Vec<SelectedFile>,
}

impl FormValues {
    pub fn get(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Documents => FieldValue::Files(&self.documents),
            _ => FieldValue::Text(self.text_slot(field).map(String::as_str).unwrap_or("")),
        }
    }

    /// Text value of a field, or `None` for the documents field.
    pub fn text(&self, field: Field) -> Option<&str> {
        self.text_slot(field).map(String::as_str)
    }

    /// Overwrite a text field. Returns whether the value changed.
    pub fn set_text(&mut self, field: Field, value: impl Into<String>) -> Result<bool, ValidationError> {
        let slot = self
            .text_slot_mut(field)
            .ok_or_else(|| ValidationError::NotATextField {
                field: field.name().to_string(),
            })?;
        let value = value.into();
        if *slot == value {
            return Ok(false);
        }
        *slot = value;
        Ok(true)
    }

    pub fn set_documents(&mut self, files: Vec<SelectedFile>) {
        self.documents = files;
    }

    /// Whether every field still holds its initial empty value.
    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    /// Text parts in multipart order (documents excluded).
    pub fn text_parts(&self) -> impl Iterator<Item = (Field, &str)> {
        Field::ALL
            .into_iter()
            .filter_map(move |f| self.text(f).map(|v| (f, v)))
    }

    fn text_slot(&self, field: Field) -> Option<&String> {
        match field {
            Field::CompanyName => Some(&self.company_name),
            Field::AreaOfService => Some(&self.area_of_service),
            Field::FullName => Some(&self.full_name),
            Field::Email => Some(&self.email),
            Field::Phone => Some(&self.phone),
            Field::Documents => None,
        }
    }

    fn text_slot_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::CompanyName => Some(&mut self.company_name),
            Field::AreaOfService => Some(&mut self.area_of_service),
            Field::FullName => Some(&mut self.full_name),
            Field::Email => Some(&mut self.email),
            Field::Phone => Some(&mut self.phone),
            Field::Documents => None,
        }
    }
}
