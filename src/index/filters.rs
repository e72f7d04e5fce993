// Precomputed-filter folding (SPEC_FULL.md §4.3).
//
// Each pad with a PadFilter contributes directly to that pad's own
// `negativeCampaigns` entry (first use allocates a copy of the pad's
// `any` bitset, later pads with a filter AND into it) and to that
// pad's own `filteredBanners` set. Inheritance across the pad DAG is
// not done here — it happens at query time by folding over
// `effectivePads` (§4.6), so this phase never walks ancestors.
//
// The partially-filtered campaign set (`any \ all`) is computed
// out-of-place via `Bitset::sub` rather than mutating the shared
// `any` bank entry and restoring it afterward.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::bitset::Bitset;
use crate::catalog::Catalog;

pub fn build_filters(
    catalog: &Catalog,
    negative_campaigns: &mut HashMap<u32, Bitset>,
) -> HashMap<u32, HashSet<u32>> {
    let mut filtered_banners: HashMap<u32, HashSet<u32>> = HashMap::new();

    for (&pad_id, filter) in &catalog.pad_filters {
        let all = &catalog.campaign_bitsets[filter.all];
        let any = &catalog.campaign_bitsets[filter.any];
        let banners = &catalog.banner_bitsets[filter.banners];

        negative_campaigns
            .entry(pad_id)
            .and_modify(|nc| nc.and_assign(any))
            .or_insert_with(|| any.clone());

        let partially_filtered = any.sub(all);
        let mut blocked = HashSet::new();
        for campaign_idx in partially_filtered.iter_ones() {
            let ic = &catalog.indexed_campaigns[campaign_idx];
            let start = ic.first_banner_position as usize;
            let end = start + ic.banner_count as usize;
            for k in start..end {
                if !banners.test(k) {
                    blocked.insert(catalog.indexed_banners[k].banner_id);
                }
            }
        }
        if !blocked.is_empty() {
            filtered_banners.insert(pad_id, blocked);
        }
    }

    info!(
        pads_with_filters = catalog.pad_filters.len(),
        pads_with_partial_banners = filtered_banners.len(),
        "folded precomputed filters into negative campaign bitsets"
    );
    filtered_banners
}
