// Flat-file catalog loader.
//
// Parses the seven whitespace-separated tables and the `index.txt`
// filter file described in SPEC_FULL.md §6. Referential errors (a row
// pointing at an unknown id) are counted and the row dropped; format
// errors (wrong header, wrong column count, non-hex digit, bitset size
// mismatch) are fatal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::bitset::Bitset;
use crate::error::{PadIndexError, Result};

use super::model::{Campaign, Catalog, IndexedBanner, IndexedCampaign, Package, Pad, PadFilter, User};

/// A flat, owned stream of whitespace-separated tokens from one file.
/// Mirrors the way the original reader treats the file as a sequence
/// of `>>`-extracted tokens rather than strict per-line records.
struct Tokens {
    file: String,
    tokens: Vec<String>,
    pos: usize,
}

impl Tokens {
    fn open(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PadIndexError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let tokens: Vec<String> = content.split_whitespace().map(str::to_owned).collect();
        Ok(Self { file: path.display().to_string(), tokens, pos: 0 })
    }

    fn fmt_err(&self, message: impl Into<String>) -> PadIndexError {
        PadIndexError::Format { file: self.file.clone(), message: message.into() }
    }

    fn next(&mut self) -> Result<&str> {
        let tok = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| self.fmt_err("unexpected end of file"))?;
        self.pos += 1;
        Ok(tok)
    }

    fn expect(&mut self, literal: &str) -> Result<()> {
        let tok = self.next()?.to_string();
        if tok != literal {
            return Err(self.fmt_err(format!("expected {literal:?}, found {tok:?}")));
        }
        Ok(())
    }

    fn expect_header(&mut self, fields: &[&str]) -> Result<()> {
        for field in fields {
            self.expect(field)?;
        }
        Ok(())
    }

    fn next_u32(&mut self) -> Result<u32> {
        let tok = self.next()?;
        tok.parse::<u32>().map_err(|_| self.fmt_err(format!("expected integer, found {tok:?}")))
    }

    fn next_usize(&mut self) -> Result<usize> {
        let tok = self.next()?;
        tok.parse::<usize>().map_err(|_| self.fmt_err(format!("expected integer, found {tok:?}")))
    }
}

pub fn load_pads(path: &Path) -> Result<HashMap<u32, Pad>> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["pad_id"])?;
    let mut pads = HashMap::new();
    while t.pos < t.tokens.len() {
        let id = t.next_u32()?;
        pads.insert(id, Pad::new(id));
    }
    info!(count = pads.len(), "loaded pads");
    Ok(pads)
}

pub fn load_pad_relations(path: &Path, pads: &mut HashMap<u32, Pad>) -> Result<()> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["pad_id", "parent_pad_id"])?;
    let mut ok = 0usize;
    let mut bad = 0usize;
    while t.pos < t.tokens.len() {
        let pad_id = t.next_u32()?;
        let parent_id = t.next_u32()?;
        if !pads.contains_key(&pad_id) || !pads.contains_key(&parent_id) {
            bad += 1;
            continue;
        }
        pads.get_mut(&pad_id).unwrap().direct_parents.push(parent_id);
        pads.get_mut(&parent_id).unwrap().direct_children.push(pad_id);
        ok += 1;
    }
    info!(ok, bad, "loaded pad relations");
    Ok(())
}

pub fn load_users(path: &Path) -> Result<HashMap<u32, User>> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["id", "parent_user_id"])?;
    let mut users = HashMap::new();
    while t.pos < t.tokens.len() {
        let id = t.next_u32()?;
        let parent_id = t.next_u32()?;
        // Duplicate ids: last-writer-wins, matching the reference loader.
        users.insert(id, User::new(id, parent_id));
    }
    let mut bad = 0usize;
    for user in users.values() {
        if user.parent_id != 0 && !users.contains_key(&user.parent_id) {
            bad += 1;
        }
    }
    info!(count = users.len(), bad_parents = bad, "loaded users");
    Ok(users)
}

pub fn load_campaigns(
    path: &Path,
    users: &HashMap<u32, User>,
) -> Result<(HashMap<u32, Campaign>, HashMap<u32, Package>)> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["id", "user_id", "package_id"])?;
    let mut campaigns = HashMap::new();
    let mut packages: HashMap<u32, Package> = HashMap::new();
    let mut bad = 0usize;
    while t.pos < t.tokens.len() {
        let id = t.next_u32()?;
        let user_id = t.next_u32()?;
        let package_id = t.next_u32()?;
        packages.entry(package_id).or_insert_with(|| Package::new(package_id));
        let user_known = users.contains_key(&user_id);
        if !user_known {
            bad += 1;
        }
        campaigns.insert(id, Campaign::new(id, user_id, package_id, user_known));
    }
    info!(count = campaigns.len(), bad_users = bad, "loaded campaigns");
    Ok((campaigns, packages))
}

enum TargetingType {
    Positive,
    Negative,
}

fn parse_targeting_type(t: &mut Tokens) -> Result<TargetingType> {
    match t.next()? {
        "positive" => Ok(TargetingType::Positive),
        "negative" => Ok(TargetingType::Negative),
        other => Err(t.fmt_err(format!("wrong targeting type: {other:?}"))),
    }
}

pub fn load_targeting_user(
    path: &Path,
    users: &mut HashMap<u32, User>,
    pads: &mut HashMap<u32, Pad>,
) -> Result<()> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["user_id", "pad_id", "type"])?;
    let mut ok = 0usize;
    let mut bad = 0usize;
    while t.pos < t.tokens.len() {
        let user_id = t.next_u32()?;
        let pad_id = t.next_u32()?;
        let kind = parse_targeting_type(&mut t)?;
        if !users.contains_key(&user_id) || !pads.contains_key(&pad_id) {
            bad += 1;
            continue;
        }
        pads.get_mut(&pad_id).unwrap().has_targetings_or_filters = true;
        let user = users.get_mut(&user_id).unwrap();
        match kind {
            TargetingType::Positive => user.positive_targeting_pads.push(pad_id),
            TargetingType::Negative => user.negative_targeting_pads.push(pad_id),
        }
        ok += 1;
    }
    info!(ok, bad, "loaded user targetings");
    Ok(())
}

pub fn load_targeting_package(
    path: &Path,
    packages: &mut HashMap<u32, Package>,
    pads: &mut HashMap<u32, Pad>,
) -> Result<()> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["package_id", "pad_id", "type"])?;
    let mut ok = 0usize;
    let mut bad = 0usize;
    while t.pos < t.tokens.len() {
        let package_id = t.next_u32()?;
        let pad_id = t.next_u32()?;
        let kind = parse_targeting_type(&mut t)?;
        if !pads.contains_key(&pad_id) {
            bad += 1;
            continue;
        }
        pads.get_mut(&pad_id).unwrap().has_targetings_or_filters = true;
        let package = packages.entry(package_id).or_insert_with(|| Package::new(package_id));
        match kind {
            TargetingType::Positive => package.positive_targeting_pads.push(pad_id),
            TargetingType::Negative => package.negative_targeting_pads.push(pad_id),
        }
        ok += 1;
    }
    info!(ok, bad, "loaded package targetings");
    Ok(())
}

pub fn load_targeting_campaign(
    path: &Path,
    campaigns: &mut HashMap<u32, Campaign>,
    pads: &mut HashMap<u32, Pad>,
) -> Result<()> {
    let mut t = Tokens::open(path)?;
    t.expect_header(&["campaign_id", "pad_id", "type"])?;
    let mut ok = 0usize;
    let mut bad = 0usize;
    while t.pos < t.tokens.len() {
        let campaign_id = t.next_u32()?;
        let pad_id = t.next_u32()?;
        let kind = parse_targeting_type(&mut t)?;
        if !campaigns.contains_key(&campaign_id) || !pads.contains_key(&pad_id) {
            bad += 1;
            continue;
        }
        pads.get_mut(&pad_id).unwrap().has_targetings_or_filters = true;
        let campaign = campaigns.get_mut(&campaign_id).unwrap();
        match kind {
            TargetingType::Positive => campaign.positive_targeting_pads.push(pad_id),
            TargetingType::Negative => campaign.negative_targeting_pads.push(pad_id),
        }
        ok += 1;
    }
    info!(ok, bad, "loaded campaign targetings");
    Ok(())
}

/// Decode one bitset-bank entry: `original_size` bits packed as
/// `ceil(original_size / 4)` lower-case hex digits (little-endian
/// nibbles), skipping the original bit positions listed in `skip`
/// (which must be sorted ascending).
fn bitset_from_hex(hex: &str, original_size: usize, skip: &[usize], file: &str) -> Result<Bitset> {
    let expected_len = (original_size + 3) / 4;
    if hex.len() != expected_len {
        return Err(PadIndexError::Format {
            file: file.to_string(),
            message: format!(
                "bitset hex string has {} digits, expected {expected_len}",
                hex.len()
            ),
        });
    }
    let mut result = Bitset::with_size(original_size - skip.len(), false);
    let mut skip_idx = 0usize;
    let mut result_pos = 0usize;
    for (i, c) in hex.chars().enumerate() {
        let digit = c.to_digit(16).ok_or_else(|| PadIndexError::Format {
            file: file.to_string(),
            message: format!("non-hex digit {c:?} in bitset string"),
        })?;
        for j in 0..4 {
            let original_pos = i * 4 + j;
            if original_pos >= original_size {
                break;
            }
            if skip_idx < skip.len() && skip[skip_idx] == original_pos {
                skip_idx += 1;
                continue;
            }
            if (digit >> j) & 1 != 0 {
                result.set_bit(result_pos);
            }
            result_pos += 1;
        }
    }
    Ok(result)
}

/// Parses `index.txt`: the precomputed campaign/banner lists, the two
/// bitset banks, and the per-pad filter table. Populates
/// `catalog.indexed_campaigns`, `indexed_banners`, `campaign_bitsets`,
/// `banner_bitsets`, and `pad_filters`.
pub fn load_precalculated_filters(path: &Path, catalog: &mut Catalog) -> Result<()> {
    let mut t = Tokens::open(path)?;

    t.expect_header(&["Campaigns", "(id)"])?;
    let original_campaign_count = t.next_usize()?;
    if original_campaign_count == 0 {
        return Err(t.fmt_err("must have at least one campaign"));
    }
    let mut skipped_campaigns = Vec::new();
    for i in 0..original_campaign_count {
        let campaign_id = t.next_u32()?;
        match catalog.campaigns.get(&campaign_id) {
            None => skipped_campaigns.push(i),
            Some(camp) => {
                catalog.indexed_campaigns.push(IndexedCampaign {
                    user_id: camp.user_id,
                    campaign_id,
                    first_banner_position: 0,
                    banner_count: 0,
                });
            }
        }
    }

    {
        let mut seen_users = std::collections::HashSet::new();
        let mut last_user: Option<u32> = None;
        let mut transitions = 0usize;
        for ic in &catalog.indexed_campaigns {
            if last_user != Some(ic.user_id) {
                transitions += 1;
                last_user = Some(ic.user_id);
            }
            seen_users.insert(ic.user_id);
        }
        if transitions != seen_users.len() {
            return Err(PadIndexError::Structural("order of users is broken".into()));
        }
    }

    t.expect_header(&["Banners", "(id,", "campaign_id)"])?;
    let original_banner_count = t.next_usize()?;
    if original_banner_count == 0 {
        return Err(t.fmt_err("must have at least one banner"));
    }
    let mut skipped_banners = Vec::new();
    let mut pos_in_indexed_campaigns = 0usize;
    if !catalog.indexed_campaigns.is_empty() {
        catalog.indexed_campaigns[0].first_banner_position = 0;
        catalog.indexed_campaigns[0].banner_count = 0;
    }
    for i in 0..original_banner_count {
        let banner_id = t.next_u32()?;
        let campaign_id = t.next_u32()?;
        if !catalog.campaigns.contains_key(&campaign_id) {
            skipped_banners.push(i);
            continue;
        }
        if catalog.indexed_campaigns[pos_in_indexed_campaigns].campaign_id != campaign_id {
            pos_in_indexed_campaigns += 1;
            if pos_in_indexed_campaigns == catalog.indexed_campaigns.len() {
                return Err(PadIndexError::Structural("campaign disorder in banner list".into()));
            }
            catalog.indexed_campaigns[pos_in_indexed_campaigns].first_banner_position =
                catalog.indexed_banners.len() as u32;
            catalog.indexed_campaigns[pos_in_indexed_campaigns].banner_count = 0;
        }
        if catalog.indexed_campaigns[pos_in_indexed_campaigns].campaign_id != campaign_id {
            return Err(PadIndexError::Structural("campaign disorder in banner list".into()));
        }
        catalog.indexed_campaigns[pos_in_indexed_campaigns].banner_count += 1;
        catalog.campaigns.get_mut(&campaign_id).unwrap().banner_ids.push(banner_id);
        catalog.indexed_banners.push(IndexedBanner {
            user_id: catalog.campaigns[&campaign_id].user_id,
            campaign_id,
            banner_id,
        });
    }

    // Paranoiac check mirroring the reference loader.
    let mut check_banner_count = 0usize;
    for ic in &catalog.indexed_campaigns {
        check_banner_count += ic.banner_count as usize;
        for j in 0..ic.banner_count {
            let k = ic.first_banner_position as usize + j as usize;
            if k >= catalog.indexed_banners.len()
                || catalog.indexed_banners[k].user_id != ic.user_id
                || catalog.indexed_banners[k].campaign_id != ic.campaign_id
            {
                return Err(PadIndexError::Structural("banner/campaign slice mismatch".into()));
            }
        }
    }
    if check_banner_count != catalog.indexed_banners.len() {
        return Err(PadIndexError::Structural("banner count mismatch".into()));
    }

    info!(
        campaigns = catalog.indexed_campaigns.len(),
        skipped_campaigns = skipped_campaigns.len(),
        banners = catalog.indexed_banners.len(),
        skipped_banners = skipped_banners.len(),
        "loaded indexed campaigns/banners"
    );

    t.expect_header(&["Campaign", "bitsets:"])?;
    let campaign_bitset_count = t.next_usize()?;
    catalog.campaign_bitsets = vec![Bitset::new(); campaign_bitset_count];
    for _ in 0..campaign_bitset_count {
        let bitset_id = t.next_usize()?;
        let hex = t.next()?.to_string();
        if bitset_id >= catalog.campaign_bitsets.len() {
            return Err(t.fmt_err(format!("campaign bitset id {bitset_id} out of range")));
        }
        catalog.campaign_bitsets[bitset_id] =
            bitset_from_hex(&hex, original_campaign_count, &skipped_campaigns, &t.file)?;
    }

    t.expect_header(&["Banner", "bitsets:"])?;
    let banner_bitset_count = t.next_usize()?;
    catalog.banner_bitsets = vec![Bitset::new(); banner_bitset_count];
    for _ in 0..banner_bitset_count {
        let bitset_id = t.next_usize()?;
        let hex = t.next()?.to_string();
        if bitset_id >= catalog.banner_bitsets.len() {
            return Err(t.fmt_err(format!("banner bitset id {bitset_id} out of range")));
        }
        catalog.banner_bitsets[bitset_id] =
            bitset_from_hex(&hex, original_banner_count, &skipped_banners, &t.file)?;
    }

    info!(
        campaign_bitsets = catalog.campaign_bitsets.len(),
        banner_bitsets = catalog.banner_bitsets.len(),
        "loaded bitset banks"
    );

    t.expect_header(&["pad_id/full/any/banner:"])?;
    let filter_pad_count = t.next_usize()?;
    let mut skipped_pads = 0usize;
    for _ in 0..filter_pad_count {
        let pad_id = t.next_u32()?;
        let full_id = t.next_usize()?;
        let any_id = t.next_usize()?;
        let banners_id = t.next_usize()?;

        if full_id >= catalog.campaign_bitsets.len()
            || any_id >= catalog.campaign_bitsets.len()
            || banners_id >= catalog.banner_bitsets.len()
        {
            return Err(t.fmt_err(format!("pad {pad_id} references an out-of-range bitset bank entry")));
        }
        let all = &catalog.campaign_bitsets[full_id];
        let any = &catalog.campaign_bitsets[any_id];
        let banners = &catalog.banner_bitsets[banners_id];
        if all.size() != catalog.indexed_campaigns.len()
            || any.size() != catalog.indexed_campaigns.len()
        {
            return Err(PadIndexError::Format {
                file: t.file.clone(),
                message: "pad filter campaign bitset size mismatch".into(),
            });
        }
        if banners.size() != catalog.indexed_banners.len() {
            return Err(PadIndexError::Format {
                file: t.file.clone(),
                message: "pad filter banner bitset size mismatch".into(),
            });
        }

        if !catalog.pads.contains_key(&pad_id) {
            skipped_pads += 1;
            continue;
        }
        catalog.pads.get_mut(&pad_id).unwrap().has_targetings_or_filters = true;
        catalog.pad_filters.insert(pad_id, PadFilter { all: full_id, any: any_id, banners: banners_id });
    }

    info!(loaded = catalog.pad_filters.len(), skipped = skipped_pads, "loaded pad filters");

    t.expect("Done")?;
    Ok(())
}

/// Load every flat file and the filter file from `dir`, in the order
/// the reference loader uses.
pub fn load_catalog(dir: &Path) -> Result<Catalog> {
    let path = |name: &str| -> PathBuf { dir.join(name) };

    let mut pads = load_pads(&path("pad.txt"))?;
    load_pad_relations(&path("pad_relation.txt"), &mut pads)?;
    let mut users = load_users(&path("user.txt"))?;
    let (mut campaigns, mut packages) = load_campaigns(&path("campaign.txt"), &users)?;

    load_targeting_user(&path("targeting_user.txt"), &mut users, &mut pads)?;
    load_targeting_package(&path("targeting_package.txt"), &mut packages, &mut pads)?;
    load_targeting_campaign(&path("targeting_campaign.txt"), &mut campaigns, &mut pads)?;

    let mut catalog = Catalog { pads, users, packages, campaigns, ..Catalog::new() };
    load_precalculated_filters(&path("index.txt"), &mut catalog)?;

    for user in catalog.users.values() {
        if user.parent_id != 0 && !catalog.users.contains_key(&user.parent_id) {
            warn!(user = user.id, parent = user.parent_id, "user has unknown parent, treated as root");
        }
    }

    Ok(catalog)
}
