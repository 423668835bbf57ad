use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult, Entity, EntityId, Money};

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub EntityId);

impl ProductId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Fields for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub stock: u64,
}

/// Partial update of a product. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<u64>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.stock.is_none()
    }
}

/// Entity: a product in the catalog.
///
/// Invariants: the name is non-empty (trimmed), the price is strictly
/// positive, and stock can never go below zero (enforced by the unsigned type
/// plus the conditional decrement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    price: Money,
    stock: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Product {
    /// Validate the fields and create a product.
    ///
    /// Note: name *uniqueness* spans the whole catalog and is enforced by the
    /// store; the entity can only validate its own fields.
    pub fn create(id: ProductId, fields: NewProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = validate_name(fields.name)?;
        if fields.price.is_zero() {
            return Err(DomainError::validation("price must be greater than zero"));
        }

        Ok(Self {
            id,
            name,
            price: fields.price,
            stock: fields.stock,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a product from stored state. The fields are assumed to have
    /// been validated when they were first written.
    pub fn from_parts(
        id: ProductId,
        name: String,
        price: Money,
        stock: u64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            price,
            stock,
            created_at,
            updated_at,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u64 {
        self.stock
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply a partial update, re-running the same field validation as
    /// creation and refreshing `updated_at`.
    pub fn apply_update(&mut self, update: ProductUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(name) = update.name {
            self.name = validate_name(name)?;
        }
        if let Some(price) = update.price {
            if price.is_zero() {
                return Err(DomainError::validation("price must be greater than zero"));
            }
            self.price = price;
        }
        if let Some(stock) = update.stock {
            self.stock = stock;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Conditionally reduce stock. Used only by order placement, inside the
    /// store's transaction boundary.
    ///
    /// Fails (leaving stock untouched) instead of ever going negative.
    pub fn decrement_stock(&mut self, amount: u64, now: DateTime<Utc>) -> DomainResult<()> {
        let Some(remaining) = self.stock.checked_sub(amount) else {
            return Err(DomainError::invariant(format!(
                "insufficient stock: available {}, requested {}",
                self.stock, amount
            )));
        };
        self.stock = remaining;
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

fn validate_name(name: String) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::EntityId;

    fn test_product_id() -> ProductId {
        ProductId::new(EntityId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn widget(stock: u64) -> Product {
        Product::create(
            test_product_id(),
            NewProduct {
                name: "Widget".to_string(),
                price: Money::from_cents(500),
                stock,
            },
            test_time(),
        )
        .unwrap()
    }

    #[test]
    fn create_sets_fields_and_timestamps() {
        let now = test_time();
        let id = test_product_id();
        let product = Product::create(
            id,
            NewProduct {
                name: "  Widget ".to_string(),
                price: Money::from_cents(500),
                stock: 10,
            },
            now,
        )
        .unwrap();

        assert_eq!(product.id_typed(), id);
        assert_eq!(product.name(), "Widget");
        assert_eq!(product.price(), Money::from_cents(500));
        assert_eq!(product.stock(), 10);
        assert_eq!(product.created_at(), now);
        assert_eq!(product.updated_at(), now);
    }

    #[test]
    fn create_rejects_empty_name() {
        let err = Product::create(
            test_product_id(),
            NewProduct {
                name: "   ".to_string(),
                price: Money::from_cents(500),
                stock: 0,
            },
            test_time(),
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_rejects_zero_price() {
        let err = Product::create(
            test_product_id(),
            NewProduct {
                name: "Widget".to_string(),
                price: Money::ZERO,
                stock: 0,
            },
            test_time(),
        )
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_refreshes_updated_at_but_not_created_at() {
        let mut product = widget(10);
        let created = product.created_at();
        let later = created + chrono::Duration::seconds(5);

        product
            .apply_update(
                ProductUpdate {
                    price: Some(Money::from_cents(700)),
                    ..ProductUpdate::default()
                },
                later,
            )
            .unwrap();

        assert_eq!(product.price(), Money::from_cents(700));
        assert_eq!(product.created_at(), created);
        assert_eq!(product.updated_at(), later);
    }

    #[test]
    fn update_runs_same_validation_as_create() {
        let mut product = widget(10);

        let err = product
            .apply_update(
                ProductUpdate {
                    name: Some("".to_string()),
                    ..ProductUpdate::default()
                },
                test_time(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = product
            .apply_update(
                ProductUpdate {
                    price: Some(Money::ZERO),
                    ..ProductUpdate::default()
                },
                test_time(),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        // Failed updates leave the entity as it was.
        assert_eq!(product.name(), "Widget");
        assert_eq!(product.price(), Money::from_cents(500));
    }

    #[test]
    fn decrement_stock_reduces_and_refreshes() {
        let mut product = widget(10);
        let later = product.updated_at() + chrono::Duration::seconds(1);

        product.decrement_stock(3, later).unwrap();
        assert_eq!(product.stock(), 7);
        assert_eq!(product.updated_at(), later);
    }

    #[test]
    fn decrement_stock_never_goes_negative() {
        let mut product = widget(2);
        let before = product.updated_at();

        let err = product.decrement_stock(5, test_time()).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(product.stock(), 2);
        assert_eq!(product.updated_at(), before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: stock never goes negative, whatever the decrement.
            #[test]
            fn stock_stays_non_negative(stock in 0u64..10_000, amount in 0u64..20_000) {
                let mut product = Product::create(
                    test_product_id(),
                    NewProduct {
                        name: "Widget".to_string(),
                        price: Money::from_cents(500),
                        stock,
                    },
                    test_time(),
                )
                .unwrap();

                let result = product.decrement_stock(amount, test_time());
                if amount <= stock {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(product.stock(), stock - amount);
                } else {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(product.stock(), stock);
                }
            }
        }
    }
}
