//! Uploaded KYC evidence

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{DocumentType, VerificationStatus};

/// Metadata supplied when a document is uploaded
///
/// File bytes are held by the document store; only the content hash is kept here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUpload {
    pub document_type: DocumentType,
    pub document_name: String,
    pub file_hash: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub document_number: Option<String>,
    #[serde(default)]
    pub issue_date: Option<NaiveDate>,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

impl DocumentUpload {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.document_name.trim().is_empty() {
            return Err(CoreError::validation("document_name", "must not be empty"));
        }
        if self.file_hash.trim().is_empty() {
            return Err(CoreError::validation("file_hash", "must not be empty"));
        }
        if let (Some(issued), Some(expires)) = (self.issue_date, self.expiry_date) {
            if expires < issued {
                return Err(CoreError::validation(
                    "expiry_date",
                    "must not precede issue_date",
                ));
            }
        }
        Ok(())
    }
}

/// A document on file for a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub document_type: DocumentType,
    pub document_name: String,
    pub file_hash: String,
    pub file_size: u64,
    pub verification_status: VerificationStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub verification_notes: String,
    pub document_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    pub fn from_upload(upload: DocumentUpload, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_type: upload.document_type,
            document_name: upload.document_name,
            file_hash: upload.file_hash,
            file_size: upload.file_size,
            verification_status: VerificationStatus::Pending,
            verified_by: None,
            verified_at: None,
            verification_notes: String::new(),
            document_number: upload.document_number,
            issue_date: upload.issue_date,
            expiry_date: upload.expiry_date,
            uploaded_at: now,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verification_status == VerificationStatus::Verified
    }

    /// Verified and expiring in `(today, today + window_days]`
    pub fn expires_within(&self, today: NaiveDate, window_days: i64) -> bool {
        if !self.is_verified() {
            return false;
        }
        match self.expiry_date {
            Some(expiry) => expiry > today && expiry <= today + chrono::Duration::days(window_days),
            None => false,
        }
    }
}
