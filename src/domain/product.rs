//! A licensable good owned by a brand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LicenseError, LicenseResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub brand_id: Uuid,
    pub name: String,
    /// Unique within the owning brand.
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(brand_id: Uuid, name: String, slug: String) -> LicenseResult<Self> {
        if name.is_empty() || name.len() > 255 {
            return Err(LicenseError::Validation(
                "product name must be 1..255 characters".to_string(),
            ));
        }
        if slug.is_empty() || slug.len() > 100 {
            return Err(LicenseError::Validation(
                "product slug must be 1..100 characters".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            brand_id,
            name,
            slug,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_product_succeeds() {
        let brand_id = Uuid::new_v4();
        let product = Product::create(brand_id, "Pro Plan".into(), "pro".into()).unwrap();
        assert_eq!(product.brand_id, brand_id);
        assert_eq!(product.slug, "pro");
    }

    #[test]
    fn create_rejects_empty_slug() {
        assert!(Product::create(Uuid::new_v4(), "Pro".into(), "".into()).is_err());
    }
}
