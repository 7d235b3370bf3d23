// ABOUTME: Client user id normalization and placeholder user provisioning
// ABOUTME: Maps arbitrary client ids onto stable UUIDs so foreign keys always resolve
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use fitai_core::constants::users::USER_ID_NAMESPACE_PREFIX;
use fitai_core::errors::AppResult;
use uuid::Uuid;

use crate::database::Database;

/// Canonical UUID string for a client-supplied id
///
/// Valid UUIDs are re-rendered in canonical lowercase form; anything else is
/// hashed with UUID v5 under the URL namespace as `fitai:<id>`.
#[must_use]
pub fn normalize_user_id(raw: &str) -> String {
    let raw = raw.trim();
    Uuid::parse_str(raw).map_or_else(
        |_| {
            Uuid::new_v5(
                &Uuid::NAMESPACE_URL,
                format!("{USER_ID_NAMESPACE_PREFIX}{raw}").as_bytes(),
            )
            .to_string()
        },
        |id| id.to_string(),
    )
}

/// Normalize an id and make sure a user row exists for it
///
/// # Errors
///
/// Returns an error if the placeholder insert fails
pub async fn ensure_user(database: &Database, raw: &str) -> AppResult<String> {
    let user_id = normalize_user_id(raw);
    database.users().ensure_exists(&user_id).await?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_passes_through() {
        let id = "6F9619FF-8B86-D011-B42D-00C04FC964FF";
        assert_eq!(normalize_user_id(id), id.to_lowercase());
    }

    #[test]
    fn test_non_uuid_is_deterministic() {
        let first = normalize_user_id("device-123");
        assert_eq!(first, normalize_user_id("device-123"));
        assert_ne!(first, normalize_user_id("device-124"));
        assert!(Uuid::parse_str(&first).is_ok());
        assert_eq!(
            first,
            Uuid::new_v5(&Uuid::NAMESPACE_URL, b"fitai:device-123").to_string()
        );
    }
}
