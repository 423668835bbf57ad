//! `storefront-catalog` — the product catalog domain.
//!
//! Owns the `Product` entity: names, prices, stock levels, and the rules that
//! keep them valid. Persistence lives in `storefront-infra`.

pub mod product;

pub use product::{NewProduct, Product, ProductId, ProductUpdate};
