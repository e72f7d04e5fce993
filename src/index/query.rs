// Query surface (SPEC_FULL.md §4.6): turning the tables built by the
// other `index` submodules into answers for a given pad.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::bitset::Bitset;
use crate::index::PadIndex;

static EMPTY_BANNERS: Lazy<HashSet<u32>> = Lazy::new(HashSet::new);

impl PadIndex {
    /// Campaigns eligible to serve at `pad_id`, as a bitset indexed by
    /// campaign position (see `IndexedCampaign`). Positive targetings
    /// are inherited downward: any ancestor-or-self pad positively
    /// targeting a campaign admits it. Negatives (and folded filters)
    /// are cumulative: any ancestor-or-self pad's negative bitset
    /// clears it. Only pads in `effectivePads` carry either table, so
    /// the fold only ever touches that short list. Allocates exactly
    /// one result bitset; never owning copies of the source bitsets.
    pub fn campaigns_by_pad(&self, pad_id: u32) -> Bitset {
        let campaign_count = self.catalog.indexed_campaigns.len();
        let Some(pad) = self.catalog.pads.get(&pad_id) else {
            return Bitset::with_size(campaign_count, false);
        };
        let mut eligible = Bitset::with_size(campaign_count, false);

        for q in &pad.effective_pads {
            if let Some(positive) = self.positive_campaigns.get(q) {
                eligible.or_assign(positive);
            }
        }
        for q in &pad.effective_pads {
            if let Some(negative) = self.negative_campaigns.get(q) {
                eligible.and_assign(negative);
            }
        }

        eligible
    }

    /// Banner ids blocked at `pad_id` by a precomputed filter, keyed
    /// through the pad's effective-pad group so identical pads share
    /// one lookup.
    pub fn filtered_banners_by_pad(&self, pad_id: u32) -> &HashSet<u32> {
        let Some(pad) = self.catalog.pads.get(&pad_id) else {
            return &EMPTY_BANNERS;
        };
        self.filtered_banners_by_group
            .get(&pad.effective_group_id)
            .unwrap_or(&EMPTY_BANNERS)
    }

    /// All campaign/banner pairs that pass `pad_id`, for the interactive CLI.
    pub fn eligible_banners_by_pad(&self, pad_id: u32) -> Vec<u32> {
        let eligible = self.campaigns_by_pad(pad_id);
        let blocked = self.filtered_banners_by_pad(pad_id);
        let mut banners = Vec::new();
        for campaign_idx in eligible.iter_ones() {
            let ic = &self.catalog.indexed_campaigns[campaign_idx];
            let start = ic.first_banner_position as usize;
            let end = start + ic.banner_count as usize;
            for banner in &self.catalog.indexed_banners[start..end] {
                if !blocked.contains(&banner.banner_id) {
                    banners.push(banner.banner_id);
                }
            }
        }
        banners
    }
}
