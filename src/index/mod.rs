//! Index build and query core (SPEC_FULL.md §4).
//!
//! [`PadIndex::build`] runs the four-phase pipeline over a loaded
//! [`Catalog`]: targeting bitsets, precomputed-filter folding,
//! effective-pad grouping, then cumulative filtered-banner sets. The
//! result answers [`PadIndex::campaigns_by_pad`] and
//! [`PadIndex::filtered_banners_by_pad`] without further traversal.

mod effective;
mod filters;
mod query;
mod targeting;

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::bitset::Bitset;
use crate::catalog::Catalog;
use crate::error::Result;

pub struct PadIndex {
    catalog: Catalog,
    positive_campaigns: HashMap<u32, Bitset>,
    negative_campaigns: HashMap<u32, Bitset>,
    filtered_banners_by_group: HashMap<u32, HashSet<u32>>,
}

impl PadIndex {
    pub fn build(mut catalog: Catalog) -> Result<Self> {
        let (positive_campaigns, mut negative_campaigns) = targeting::build_targetings(&catalog);
        let filtered_banners = filters::build_filters(&catalog, &mut negative_campaigns);
        effective::build_effective_pads(&mut catalog)?;
        let filtered_banners_by_group =
            effective::build_group_cumulative_filtered_banners(&catalog, &filtered_banners);

        info!(
            pads = catalog.pads.len(),
            campaigns = catalog.indexed_campaigns.len(),
            banners = catalog.indexed_banners.len(),
            "index build complete"
        );

        Ok(Self {
            catalog,
            positive_campaigns,
            negative_campaigns,
            filtered_banners_by_group,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn pad_count(&self) -> usize {
        self.catalog.pads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Campaign, IndexedBanner, IndexedCampaign, Pad, User};

    fn pad_with_own_targeting(id: u32, parent: Option<u32>) -> Pad {
        let mut pad = Pad::new(id);
        pad.has_targetings_or_filters = true;
        if let Some(parent_id) = parent {
            pad.direct_parents.push(parent_id);
        }
        pad
    }

    #[test]
    fn single_pad_single_campaign_is_eligible() {
        let mut catalog = Catalog::new();
        let mut pad = pad_with_own_targeting(1, None);
        pad.has_targetings_or_filters = true;
        catalog.pads.insert(1, pad);
        catalog.users.insert(10, User::new(10, 0));
        let mut campaign = Campaign::new(100, 10, 0, true);
        campaign.positive_targeting_pads.push(1);
        catalog.campaigns.insert(100, campaign);
        catalog.indexed_campaigns.push(IndexedCampaign {
            user_id: 10,
            campaign_id: 100,
            first_banner_position: 0,
            banner_count: 1,
        });
        catalog.indexed_banners.push(IndexedBanner { user_id: 10, campaign_id: 100, banner_id: 5000 });

        let index = PadIndex::build(catalog).unwrap();
        assert!(index.campaigns_by_pad(1).test(0));
        assert!(index.campaigns_by_pad(999).none());
    }

    #[test]
    fn child_pad_inherits_parent_targeting() {
        let mut catalog = Catalog::new();
        catalog.pads.insert(1, pad_with_own_targeting(1, None));
        let mut child = Pad::new(2);
        child.direct_parents.push(1);
        catalog.pads.insert(2, child);
        catalog.users.insert(10, User::new(10, 0));
        let mut campaign = Campaign::new(100, 10, 0, true);
        campaign.positive_targeting_pads.push(1);
        catalog.campaigns.insert(100, campaign);
        catalog.indexed_campaigns.push(IndexedCampaign {
            user_id: 10,
            campaign_id: 100,
            first_banner_position: 0,
            banner_count: 1,
        });
        catalog.indexed_banners.push(IndexedBanner { user_id: 10, campaign_id: 100, banner_id: 5000 });

        let index = PadIndex::build(catalog).unwrap();
        // Pad 2 has no own targeting row; it inherits pad 1's positive
        // targeting through its effective-pad ancestor chain.
        assert!(index.campaigns_by_pad(2).test(0));
        assert!(index.campaigns_by_pad(1).test(0));
    }

    #[test]
    fn negative_targeting_overrides_positive() {
        let mut catalog = Catalog::new();
        let mut pad = pad_with_own_targeting(1, None);
        pad.has_targetings_or_filters = true;
        catalog.pads.insert(1, pad);
        catalog.users.insert(10, User::new(10, 0));
        let mut campaign = Campaign::new(100, 10, 0, true);
        campaign.positive_targeting_pads.push(1);
        campaign.negative_targeting_pads.push(1);
        catalog.campaigns.insert(100, campaign);
        catalog.indexed_campaigns.push(IndexedCampaign {
            user_id: 10,
            campaign_id: 100,
            first_banner_position: 0,
            banner_count: 1,
        });
        catalog.indexed_banners.push(IndexedBanner { user_id: 10, campaign_id: 100, banner_id: 5000 });

        let index = PadIndex::build(catalog).unwrap();
        assert!(index.campaigns_by_pad(1).none());
    }

    #[test]
    fn descendant_negative_overrides_ancestor_positive_but_not_ancestor_itself() {
        let mut catalog = Catalog::new();
        catalog.pads.insert(1, pad_with_own_targeting(1, None));
        catalog.pads.insert(2, pad_with_own_targeting(2, Some(1)));
        catalog.users.insert(10, User::new(10, 0));
        let mut campaign = Campaign::new(100, 10, 0, true);
        campaign.positive_targeting_pads.push(1);
        campaign.negative_targeting_pads.push(2);
        catalog.campaigns.insert(100, campaign);
        catalog.indexed_campaigns.push(IndexedCampaign {
            user_id: 10,
            campaign_id: 100,
            first_banner_position: 0,
            banner_count: 1,
        });
        catalog.indexed_banners.push(IndexedBanner { user_id: 10, campaign_id: 100, banner_id: 5000 });

        let index = PadIndex::build(catalog).unwrap();
        assert!(index.campaigns_by_pad(1).test(0));
        assert!(index.campaigns_by_pad(2).none());
    }
}
