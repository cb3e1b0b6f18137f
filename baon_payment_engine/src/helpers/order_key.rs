use std::fmt::Write as _;

use blake2::{Blake2b512, Digest};
use chrono::NaiveDate;
use uuid::Uuid;

use crate::db_types::ClientOrderId;

/// Derives the idempotency key for one cart partition of a checkout attempt.
///
/// The key is a Blake2b digest of the client-generated checkout id together with the partition key
/// (student, delivery date). Retrying the *same* checkout attempt therefore reuses the same key per partition,
/// while a fresh checkout click (new UUID) produces distinct keys — which is exactly the idempotency contract the
/// order engine expects.
pub fn client_order_id_for(checkout_id: &Uuid, student_id: i64, scheduled_for: NaiveDate) -> ClientOrderId {
    let mut hasher = Blake2b512::new();
    hasher.update(checkout_id.as_bytes());
    hasher.update(student_id.to_le_bytes());
    hasher.update(scheduled_for.to_string().as_bytes());
    let digest = hasher.finalize();
    let mut key = String::with_capacity(3 + 2 * 16);
    key.push_str("bo-");
    for byte in digest.iter().take(16) {
        let _ = write!(key, "{byte:02x}");
    }
    ClientOrderId(key)
}
