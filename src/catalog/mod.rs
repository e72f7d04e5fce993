//! Catalog model and flat-file loader (SPEC_FULL.md §3, §4.8, §6).

mod loader;
mod model;

pub use loader::load_catalog;
pub use model::{Campaign, Catalog, IndexedBanner, IndexedCampaign, Package, Pad, PadFilter, User};
