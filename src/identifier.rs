//! Physical and logical identifier derivation.
//!
//! Every identifier is a pure function of `(tenant, project, entity)`. The
//! tenant/project pair is folded into a fixed-width digest so that the
//! identifier length does not depend on how long tenant or project ids are.

use sha2::{Digest, Sha256};

use crate::config::DEFAULT_IDENTIFIER_MAX_LENGTH;

pub const TYPE_ID_PREFIX: &str = "e_";
pub const TABLE_PREFIX: &str = "tbl_";
const DIGEST_LEN: usize = 6;

/// Width of `e_<digest>_`, the part of a type id not available to the entity name.
pub const TYPE_ID_PREFIX_LEN: usize = TYPE_ID_PREFIX.len() + DIGEST_LEN + 1;
pub const MIN_ENTITY_NAME_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierGenerator {
    max_length: usize,
}

impl Default for IdentifierGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTIFIER_MAX_LENGTH)
    }
}

impl IdentifierGenerator {
    #[must_use]
    pub const fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }

    /// Returns the first 6 hex characters of SHA-256(`tenant_project`).
    #[must_use]
    pub fn scope_digest(tenant: &str, project: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(tenant.as_bytes());
        hasher.update(b"_");
        hasher.update(project.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(DIGEST_LEN);
        digest
    }

    #[must_use]
    pub fn table_name(&self, tenant: &str, project: &str, entity: &str) -> String {
        format!(
            "{TABLE_PREFIX}{}_{entity}",
            Self::scope_digest(tenant, project)
        )
    }

    #[must_use]
    pub fn type_id(&self, tenant: &str, project: &str, entity: &str) -> String {
        format!(
            "{TYPE_ID_PREFIX}{}_{entity}",
            Self::scope_digest(tenant, project)
        )
    }

    /// Longest entity name whose type id still fits the ceiling, floored at 2.
    #[must_use]
    pub fn max_entity_name_length(&self, _tenant: &str, _project: &str) -> usize {
        self.max_length
            .saturating_sub(TYPE_ID_PREFIX_LEN)
            .max(MIN_ENTITY_NAME_LEN)
    }

    /// Table name produced by the pre-digest naming scheme. Only consulted
    /// when dropping tables so that old deployments are cleaned up too.
    #[must_use]
    pub fn legacy_table_name(&self, tenant: &str, project: &str, entity: &str) -> String {
        format!(
            "{TABLE_PREFIX}{}_{}_{}",
            sanitize(tenant),
            sanitize(project),
            sanitize(entity)
        )
    }

    /// PascalCase class identifier used for generated binding artifacts.
    #[must_use]
    pub fn class_name(entity: &str) -> String {
        entity
            .split('_')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_fits_ceiling() {
        let ids = IdentifierGenerator::default();
        let max = ids.max_entity_name_length("t1", "p1");
        assert_eq!(max, 23);

        for len in MIN_ENTITY_NAME_LEN..=max {
            let entity = "x".repeat(len);
            assert!(ids.type_id("t1", "p1", &entity).len() <= 32);
        }
        assert_eq!(ids.type_id("t1", "p1", &"x".repeat(max)).len(), 32);
    }

    #[test]
    fn test_identifiers_are_deterministic() {
        let ids = IdentifierGenerator::default();
        assert_eq!(
            ids.table_name("t1", "p1", "orders"),
            ids.table_name("t1", "p1", "orders")
        );
        assert_eq!(
            IdentifierGenerator::scope_digest("t1", "p1"),
            IdentifierGenerator::scope_digest("t1", "p1")
        );
        // Pinned: changing the digest renames every provisioned table.
        assert_eq!(IdentifierGenerator::scope_digest("t1", "p1"), "3dde88");
    }

    #[test]
    fn test_length_independent_of_scope_ids() {
        let ids = IdentifierGenerator::default();
        let short = ids.type_id("t", "p", "orders");
        let long = ids.type_id(&"tenant".repeat(20), &"project".repeat(20), "orders");
        assert_eq!(short.len(), long.len());
    }

    #[test]
    fn test_scopes_do_not_share_tables() {
        let ids = IdentifierGenerator::default();
        assert_ne!(
            ids.table_name("t1", "p1", "orders"),
            ids.table_name("t1", "p2", "orders")
        );
        assert_ne!(
            ids.table_name("t1", "p1", "orders"),
            ids.table_name("t2", "p1", "orders")
        );
    }

    #[test]
    fn test_name_formats() {
        let ids = IdentifierGenerator::default();
        let digest = IdentifierGenerator::scope_digest("t1", "p1");
        assert_eq!(ids.type_id("t1", "p1", "orders"), format!("e_{digest}_orders"));
        assert_eq!(
            ids.table_name("t1", "p1", "orders"),
            format!("tbl_{digest}_orders")
        );
        assert_eq!(
            ids.legacy_table_name("Acme-Corp", "p 1", "orders"),
            "tbl_acme_corp_p_1_orders"
        );
    }

    #[test]
    fn test_max_length_floor() {
        let ids = IdentifierGenerator::new(4);
        assert_eq!(ids.max_entity_name_length("t", "p"), MIN_ENTITY_NAME_LEN);
    }

    #[test]
    fn test_class_name() {
        assert_eq!(IdentifierGenerator::class_name("orders"), "Orders");
        assert_eq!(IdentifierGenerator::class_name("sales_order_line"), "SalesOrderLine");
        assert_eq!(IdentifierGenerator::class_name("v2__items"), "V2Items");
    }
}
