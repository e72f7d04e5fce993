// Typed catalog records. See SPEC_FULL.md §3 for the invariants each
// of these participates in; this module only holds the data.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bitset::Bitset;

/// An ad placement slot. Pads form a DAG via `direct_parents` /
/// `direct_children` (multiple parents are permitted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pad {
    pub id: u32,
    pub direct_parents: Vec<u32>,
    pub direct_children: Vec<u32>,
    /// True iff this pad is the direct subject of any targeting row or
    /// precomputed filter.
    pub has_targetings_or_filters: bool,
    /// Sorted, deduplicated ancestor-or-self pads that carry a
    /// targeting or filter. Populated by `index::build_effective_pads`.
    pub effective_pads: Vec<u32>,
    /// Names the equivalence class of pads with an identical
    /// `effective_pads`. Populated alongside `effective_pads`.
    pub effective_group_id: u32,
}

impl Pad {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            direct_parents: Vec::new(),
            direct_children: Vec::new(),
            has_targetings_or_filters: false,
            effective_pads: Vec::new(),
            effective_group_id: 0,
        }
    }
}

/// Users form a parent chain (single parent, unlike pads). `parent_id
/// == 0` means no parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub parent_id: u32,
    pub positive_targeting_pads: Vec<u32>,
    pub negative_targeting_pads: Vec<u32>,
}

impl User {
    pub fn new(id: u32, parent_id: u32) -> Self {
        Self {
            id,
            parent_id,
            positive_targeting_pads: Vec::new(),
            negative_targeting_pads: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: u32,
    pub positive_targeting_pads: Vec<u32>,
    pub negative_targeting_pads: Vec<u32>,
}

impl Package {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            positive_targeting_pads: Vec::new(),
            negative_targeting_pads: Vec::new(),
        }
    }
}

/// A group of banners, owned by a user, associated with a package.
/// `banner_ids` is empty until the filter file is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u32,
    pub user_id: u32,
    /// `None` if `user_id` referenced an unknown user at load time; the
    /// campaign is retained but contributes no user-chain targetings.
    pub user_known: bool,
    pub package_id: u32,
    pub banner_ids: Vec<u32>,
    pub positive_targeting_pads: Vec<u32>,
    pub negative_targeting_pads: Vec<u32>,
}

impl Campaign {
    pub fn new(id: u32, user_id: u32, package_id: u32, user_known: bool) -> Self {
        Self {
            id,
            user_id,
            user_known,
            package_id,
            banner_ids: Vec::new(),
            positive_targeting_pads: Vec::new(),
            negative_targeting_pads: Vec::new(),
        }
    }
}

/// Compacted campaign record. `IndexedCampaigns` is ordered so that all
/// campaigns of the same user are contiguous, in the order campaign ids
/// appear in the filter file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexedCampaign {
    pub user_id: u32,
    pub campaign_id: u32,
    pub first_banner_position: u32,
    pub banner_count: u32,
}

/// Compacted banner record. `IndexedBanners` is ordered so that all
/// banners of the same campaign are contiguous, matching the campaign
/// order of `IndexedCampaigns`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexedBanner {
    pub user_id: u32,
    pub campaign_id: u32,
    pub banner_id: u32,
}

/// Per-pad filter, expressed as indices into the two shared bitset
/// banks rather than owned bitsets, so that many pads can point at the
/// same bank entry.
#[derive(Debug, Clone, Copy)]
pub struct PadFilter {
    /// Index into `Catalog::campaign_bitsets`. Bit k set ⇒ every banner
    /// of `IndexedCampaigns[k]` passes this pad's filter.
    pub all: usize,
    /// Index into `Catalog::campaign_bitsets`. Bit k set ⇒ at least one
    /// banner of `IndexedCampaigns[k]` passes this pad's filter.
    pub any: usize,
    /// Index into `Catalog::banner_bitsets`. Bit k set ⇒
    /// `IndexedBanners[k]` passes this pad's filter.
    pub banners: usize,
}

/// The full catalog: every entity plus the compacted index arrays and
/// filter banks, as loaded from the flat files of SPEC_FULL.md §6.
#[derive(Debug, Default)]
pub struct Catalog {
    pub pads: HashMap<u32, Pad>,
    pub users: HashMap<u32, User>,
    pub packages: HashMap<u32, Package>,
    pub campaigns: HashMap<u32, Campaign>,
    pub indexed_campaigns: Vec<IndexedCampaign>,
    pub indexed_banners: Vec<IndexedBanner>,
    pub pad_filters: HashMap<u32, PadFilter>,
    pub campaign_bitsets: Vec<Bitset>,
    pub banner_bitsets: Vec<Bitset>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }
}
