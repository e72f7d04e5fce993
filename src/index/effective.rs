// Effective-pad and cumulative-filtered-banner computation
// (SPEC_FULL.md §4.4, §4.5).
//
// A pad's "effective pads" are itself (if it carries any targeting or
// filter) plus every ancestor's, deduplicated and sorted. Two pads
// with an identical effective-pad list are interchangeable for query
// purposes, so we group them and key the expensive cumulative-banner
// computation by group rather than by pad.

use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::catalog::Catalog;
use crate::error::{PadIndexError, Result};

enum Mark {
    InProgress,
    Done(Vec<u32>),
}

pub fn build_effective_pads(catalog: &mut Catalog) -> Result<()> {
    let mut memo: HashMap<u32, Mark> = HashMap::new();
    let pad_ids: Vec<u32> = catalog.pads.keys().copied().collect();
    for pad_id in &pad_ids {
        resolve(catalog, *pad_id, &mut memo)?;
    }

    let effective: HashMap<u32, Vec<u32>> = memo
        .into_iter()
        .map(|(id, mark)| match mark {
            Mark::Done(pads) => (id, pads),
            Mark::InProgress => unreachable!("resolve never leaves a pad in-progress"),
        })
        .collect();

    // Group by a cheap commutative hash (XOR of sorted ids), then
    // disambiguate hash collisions with an exact element comparison. The
    // group id is the pad id of whichever pad first lands in a new
    // bucket — it is a real pad id, not a synthetic counter.
    let mut buckets: HashMap<u64, Vec<(u32, Vec<u32>)>> = HashMap::new();
    let mut group_count = 0usize;

    for pad_id in &pad_ids {
        let list = &effective[pad_id];
        let hash = list.iter().fold(0u64, |acc, &id| acc ^ id as u64);
        let bucket = buckets.entry(hash).or_default();

        let group_id = match bucket.iter().find(|(_, existing)| existing == list) {
            Some((group_id, _)) => *group_id,
            None => {
                bucket.push((*pad_id, list.clone()));
                group_count += 1;
                *pad_id
            }
        };

        let pad = catalog.pads.get_mut(pad_id).expect("pad_ids drawn from catalog.pads");
        pad.effective_pads = list.clone();
        pad.effective_group_id = group_id;
    }

    info!(
        pads = pad_ids.len(),
        groups = group_count,
        "grouped pads by effective ancestor set"
    );
    Ok(())
}

fn resolve(catalog: &Catalog, pad_id: u32, memo: &mut HashMap<u32, Mark>) -> Result<()> {
    if memo.contains_key(&pad_id) {
        return Ok(());
    }
    memo.insert(pad_id, Mark::InProgress);

    let pad = &catalog.pads[&pad_id];
    let mut combined: Vec<u32> = if pad.has_targetings_or_filters { vec![pad_id] } else { Vec::new() };

    let parents = pad.direct_parents.clone();
    for parent_id in parents {
        resolve(catalog, parent_id, memo)?;
        match memo.get(&parent_id) {
            Some(Mark::Done(parent_effective)) => combined.extend(parent_effective.iter().copied()),
            Some(Mark::InProgress) => {
                return Err(PadIndexError::Structural(format!(
                    "cycle detected in pad DAG while computing effective pads at pad {pad_id}"
                )));
            }
            None => unreachable!("resolve always inserts a mark before returning"),
        }
    }

    combined.sort_unstable();
    combined.dedup();
    memo.insert(pad_id, Mark::Done(combined));
    Ok(())
}

/// Cumulative filtered-banner set per effective-pad group: the union
/// of `filteredBanners[q]` over every `q` in the effective-pad list of
/// any pad belonging to that group. The source keys this table by pad
/// id despite it being a pure function of the group; we key by group
/// directly and compute each group's union exactly once.
pub fn build_group_cumulative_filtered_banners(
    catalog: &Catalog,
    filtered_banners: &HashMap<u32, HashSet<u32>>,
) -> HashMap<u32, HashSet<u32>> {
    let mut by_group: HashMap<u32, HashSet<u32>> = HashMap::new();

    for pad in catalog.pads.values() {
        if by_group.contains_key(&pad.effective_group_id) {
            continue;
        }
        let mut union = HashSet::new();
        for q in &pad.effective_pads {
            if let Some(banners) = filtered_banners.get(q) {
                union.extend(banners.iter().copied());
            }
        }
        by_group.insert(pad.effective_group_id, union);
    }

    info!(groups = by_group.len(), "computed cumulative filtered banners per group");
    by_group
}
