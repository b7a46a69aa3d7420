//! Pre-upload batch validation.
//!
//! Pure checks over a candidate batch; any violation rejects the entire
//! batch (no partial acceptance) and names the rule and offending files.
//! Quota state is never mutated here — the count is re-checked
//! authoritatively server-side before processing begins.

use crate::constants::{
    ALLOWED_CONTENT_TYPES, FREEMIUM_FILE_LIMIT, MAX_BATCH_FILES, MAX_FILE_SIZE_BYTES,
};
use crate::models::Tier;

/// A client-selected file before upload: name, declared MIME type, size.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BatchValidationError {
    #[error("Too many files: {count} (max {max} per batch)")]
    TooManyFiles { count: usize, max: usize },

    #[error("Unsupported file type for: {}", files.join(", "))]
    UnsupportedType { files: Vec<String> },

    #[error("File too large (max {max} bytes): {}", files.join(", "))]
    TooLarge { files: Vec<String>, max: usize },

    #[error("Empty file: {}", files.join(", "))]
    Empty { files: Vec<String> },

    #[error("Plan limit reached: {current} of {limit} files used, batch of {batch} would exceed it")]
    QuotaExceeded {
        current: i64,
        limit: i64,
        batch: usize,
    },
}

/// Validates an upload batch against type/size/count policy and the
/// freemium lifetime cap. Checks run in a fixed order and the first
/// violated rule is reported with every file that triggered it.
pub fn validate_batch(
    files: &[CandidateFile],
    tier: Tier,
    current_count: i64,
) -> Result<(), BatchValidationError> {
    if files.len() > MAX_BATCH_FILES {
        return Err(BatchValidationError::TooManyFiles {
            count: files.len(),
            max: MAX_BATCH_FILES,
        });
    }

    let bad_type: Vec<String> = files
        .iter()
        .filter(|f| {
            let normalized = f.content_type.to_lowercase();
            !ALLOWED_CONTENT_TYPES.iter().any(|ct| *ct == normalized)
        })
        .map(|f| f.filename.clone())
        .collect();
    if !bad_type.is_empty() {
        return Err(BatchValidationError::UnsupportedType { files: bad_type });
    }

    let too_large: Vec<String> = files
        .iter()
        .filter(|f| f.size > MAX_FILE_SIZE_BYTES)
        .map(|f| f.filename.clone())
        .collect();
    if !too_large.is_empty() {
        return Err(BatchValidationError::TooLarge {
            files: too_large,
            max: MAX_FILE_SIZE_BYTES,
        });
    }

    let empty: Vec<String> = files
        .iter()
        .filter(|f| f.size == 0)
        .map(|f| f.filename.clone())
        .collect();
    if !empty.is_empty() {
        return Err(BatchValidationError::Empty { files: empty });
    }

    if tier == Tier::Freemium && current_count + files.len() as i64 > FREEMIUM_FILE_LIMIT {
        return Err(BatchValidationError::QuotaExceeded {
            current: current_count,
            limit: FREEMIUM_FILE_LIMIT,
            batch: files.len(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(name: &str, size: usize) -> CandidateFile {
        CandidateFile {
            filename: name.to_string(),
            content_type: "image/jpeg".to_string(),
            size,
        }
    }

    #[test]
    fn accepts_valid_batch() {
        let files = vec![jpeg("a.jpg", 1024), jpeg("b.jpg", 2048)];
        assert!(validate_batch(&files, Tier::Freemium, 0).is_ok());
    }

    #[test]
    fn rejects_oversized_batch() {
        let files: Vec<_> = (0..11).map(|i| jpeg(&format!("f{i}.jpg"), 10)).collect();
        assert_eq!(
            validate_batch(&files, Tier::Premium, 0),
            Err(BatchValidationError::TooManyFiles { count: 11, max: 10 })
        );
    }

    #[test]
    fn rejects_whole_batch_on_one_bad_type() {
        let files = vec![
            jpeg("ok.jpg", 10),
            CandidateFile {
                filename: "notes.txt".to_string(),
                content_type: "text/plain".to_string(),
                size: 10,
            },
        ];
        match validate_batch(&files, Tier::Premium, 0) {
            Err(BatchValidationError::UnsupportedType { files }) => {
                assert_eq!(files, vec!["notes.txt".to_string()]);
            }
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn rejects_file_over_size_limit() {
        let files = vec![jpeg("big.jpg", MAX_FILE_SIZE_BYTES + 1)];
        assert!(matches!(
            validate_batch(&files, Tier::Premium, 0),
            Err(BatchValidationError::TooLarge { .. })
        ));
    }

    #[test]
    fn freemium_cap_counts_existing_files() {
        // 9 used + 1 new fits; 9 used + 2 new does not.
        let one = vec![jpeg("a.jpg", 10)];
        assert!(validate_batch(&one, Tier::Freemium, 9).is_ok());

        let two = vec![jpeg("a.jpg", 10), jpeg("b.jpg", 10)];
        assert_eq!(
            validate_batch(&two, Tier::Freemium, 9),
            Err(BatchValidationError::QuotaExceeded {
                current: 9,
                limit: 10,
                batch: 2,
            })
        );
    }

    #[test]
    fn premium_has_no_lifetime_cap() {
        let files = vec![jpeg("a.jpg", 10)];
        assert!(validate_batch(&files, Tier::Premium, 10_000).is_ok());
    }

    #[test]
    fn pdf_allowed_case_insensitive() {
        let files = vec![CandidateFile {
            filename: "r.pdf".to_string(),
            content_type: "Application/PDF".to_string(),
            size: 100,
        }];
        assert!(validate_batch(&files, Tier::Premium, 0).is_ok());
    }
}
