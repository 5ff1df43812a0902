//! Tenant entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LicenseError, LicenseResult};

/// A tenant of the service. Every license key, product, API key, and webhook config belongs
/// to exactly one brand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    /// URL-safe, unique, immutable after creation.
    pub slug: String,
    /// Unique, 2..10 chars, alphanumeric plus `-`/`_`, stored uppercase. Immutable.
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brand {
    /// Construct a new brand, validating the fields the caller controls.
    pub fn create(name: String, slug: String, prefix: String) -> LicenseResult<Self> {
        if name.is_empty() || name.len() > 255 {
            return Err(LicenseError::Validation(
                "brand name must be 1..255 characters".to_string(),
            ));
        }
        if slug.is_empty() || slug.len() > 100 {
            return Err(LicenseError::Validation(
                "brand slug must be 1..100 characters".to_string(),
            ));
        }
        let prefix = prefix.to_uppercase();
        if prefix.len() < 2
            || prefix.len() > 10
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(LicenseError::Validation(
                "brand prefix must be 2..10 alphanumeric/-/_ characters".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            slug,
            prefix,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rename the brand. `slug` and `prefix` are immutable once created.
    pub fn rename(&mut self, name: String) -> LicenseResult<()> {
        if name.is_empty() || name.len() > 255 {
            return Err(LicenseError::Validation(
                "brand name must be 1..255 characters".to_string(),
            ));
        }
        self.name = name;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_uppercases_prefix() {
        let brand = Brand::create("Acme".into(), "acme".into(), "ac".into()).unwrap();
        assert_eq!(brand.prefix, "AC");
    }

    #[test]
    fn create_rejects_short_prefix() {
        assert!(Brand::create("Acme".into(), "acme".into(), "a".into()).is_err());
    }

    #[test]
    fn create_rejects_empty_name() {
        assert!(Brand::create("".into(), "acme".into(), "AC".into()).is_err());
    }

    #[test]
    fn rename_updates_name_only() {
        let mut brand = Brand::create("Acme".into(), "acme".into(), "AC".into()).unwrap();
        let prefix = brand.prefix.clone();
        brand.rename("Acme Inc".into()).unwrap();
        assert_eq!(brand.name, "Acme Inc");
        assert_eq!(brand.prefix, prefix);
    }
}
