pub mod seed;
pub mod url;

use crate::domain::product::{CatalogSnapshot, ProductType};
pub use url::{normalize_url, UrlOverrides};

/// Rewrites every official URL through the overrides and scheme normalization, so runs carry the
/// link the user will actually be sent to.
pub fn apply_overrides(mut snapshot: CatalogSnapshot, overrides: &UrlOverrides) -> CatalogSnapshot {
    for a in &mut snapshot.accounts {
        a.official_url =
            overrides.resolve(&a.id, ProductType::Account, &a.provider, &a.name, &a.official_url);
    }
    for c in &mut snapshot.cards {
        c.official_url =
            overrides.resolve(&c.id, ProductType::Card, &c.provider, &c.name, &c.official_url);
    }
    snapshot
}
