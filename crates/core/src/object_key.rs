//! Object-store key naming for batch archives.
//!
//! The canonical archive for a batch lives at `<batch_id>.json.gz`; its size
//! is the verification oracle for every later commit of the same batch.
//! Trusted re-uploads go to a version-suffixed key so new evidence never
//! clobbers the canonical object.

/// Key of the canonical archive object for a batch.
pub fn canonical_object_key(batch_id: &str) -> String {
    format!("{batch_id}.json.gz")
}

/// Key for a trusted re-upload. `version` is the batch's version *before*
/// the increment, so successive overwrites produce distinct keys.
pub fn versioned_object_key(batch_id: &str, version: i64) -> String {
    format!("{batch_id}.json.gz-{version}")
}
