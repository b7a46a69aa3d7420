//! Shared key generation for storage backends.
//!
//! Key format: `receipts/{user_id}/{timestamp}_{index}_{nonce}.{ext}`.

use chrono::Utc;
use uuid::Uuid;

/// Generate a storage key for one file of an upload batch.
///
/// The millisecond timestamp plus batch index plus random nonce keeps keys
/// unique even when two batches from the same user land in the same instant.
/// The extension is taken from the original filename; files with no extension
/// get `bin`.
pub fn receipt_storage_key(user_id: Uuid, batch_index: usize, original_filename: &str) -> String {
    let ext = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .unwrap_or_else(|| "bin".to_string());
    let nonce = Uuid::new_v4().simple().to_string();

    format!(
        "receipts/{}/{}_{}_{}.{}",
        user_id,
        Utc::now().timestamp_millis(),
        batch_index,
        &nonce[..8],
        ext
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_user_scoped_and_keeps_extension() {
        let user_id = Uuid::new_v4();
        let key = receipt_storage_key(user_id, 3, "Dinner Receipt.JPG");
        assert!(key.starts_with(&format!("receipts/{}/", user_id)));
        assert!(key.ends_with(".jpg"));
        assert!(!key.contains(".."));
    }

    #[test]
    fn missing_extension_falls_back() {
        let key = receipt_storage_key(Uuid::new_v4(), 0, "receipt");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn same_instant_same_index_keys_differ() {
        let user_id = Uuid::new_v4();
        let a = receipt_storage_key(user_id, 0, "a.png");
        let b = receipt_storage_key(user_id, 0, "a.png");
        assert_ne!(a, b);
    }
}
