// End-to-end scenarios driving the flat-file loader and the full
// index build, mirroring the tiny fixtures used to pin down targeting
// inheritance, filter folding, and effective-pad grouping.

use std::io::Write;
use std::path::Path;

use pad_index::catalog::load_catalog;
use pad_index::index::PadIndex;

fn write_file(dir: &Path, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

struct Fixture {
    pads: String,
    pad_relations: String,
    users: String,
    campaigns: String,
    targeting_user: String,
    targeting_package: String,
    targeting_campaign: String,
    index: String,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            pads: "pad_id\n".into(),
            pad_relations: "pad_id parent_pad_id\n".into(),
            users: "id parent_user_id\n".into(),
            campaigns: "id user_id package_id\n".into(),
            targeting_user: "user_id pad_id type\n".into(),
            targeting_package: "package_id pad_id type\n".into(),
            targeting_campaign: "campaign_id pad_id type\n".into(),
            index: String::new(),
        }
    }
}

impl Fixture {
    fn build(&self) -> PadIndex {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path();
        write_file(p, "pad.txt", &self.pads);
        write_file(p, "pad_relation.txt", &self.pad_relations);
        write_file(p, "user.txt", &self.users);
        write_file(p, "campaign.txt", &self.campaigns);
        write_file(p, "targeting_user.txt", &self.targeting_user);
        write_file(p, "targeting_package.txt", &self.targeting_package);
        write_file(p, "targeting_campaign.txt", &self.targeting_campaign);
        write_file(p, "index.txt", &self.index);
        let catalog = load_catalog(p).unwrap();
        PadIndex::build(catalog).unwrap()
    }
}

fn no_filters_index(campaign_id: u32) -> String {
    format!(
        "Campaigns (id)\n1\n{campaign_id}\n\
         Banners (id, campaign_id)\n1\n5000 {campaign_id}\n\
         Campaign bitsets:\n0\n\
         Banner bitsets:\n0\n\
         pad_id/full/any/banner:\n0\n\
         Done\n"
    )
}

#[test]
fn single_pad_single_campaign_no_filters() {
    let mut fx = Fixture::default();
    fx.pads = "pad_id\n1\n".into();
    fx.users = "id parent_user_id\n10 0\n".into();
    fx.campaigns = "id user_id package_id\n100 10 1000\n".into();
    fx.targeting_campaign = "campaign_id pad_id type\n100 1 positive\n".into();
    fx.index = no_filters_index(100);

    let index = fx.build();
    assert!(index.campaigns_by_pad(1).test(0));
    assert!(index.filtered_banners_by_pad(1).is_empty());
}

#[test]
fn inheritance_through_pad_dag() {
    let mut fx = Fixture::default();
    fx.pads = "pad_id\n1\n2\n".into();
    fx.pad_relations = "pad_id parent_pad_id\n2 1\n".into();
    fx.users = "id parent_user_id\n10 0\n".into();
    fx.campaigns = "id user_id package_id\n100 10 1000\n".into();
    fx.targeting_campaign = "campaign_id pad_id type\n100 1 positive\n".into();
    fx.index = no_filters_index(100);

    let index = fx.build();
    assert!(index.campaigns_by_pad(1).test(0));
    assert!(index.campaigns_by_pad(2).test(0));
}

#[test]
fn negative_at_descendant_overrides_ancestor_positive() {
    let mut fx = Fixture::default();
    fx.pads = "pad_id\n1\n2\n".into();
    fx.pad_relations = "pad_id parent_pad_id\n2 1\n".into();
    fx.users = "id parent_user_id\n10 0\n".into();
    fx.campaigns = "id user_id package_id\n100 10 1000\n".into();
    fx.targeting_campaign = "campaign_id pad_id type\n100 1 positive\n100 2 negative\n".into();
    fx.index = no_filters_index(100);

    let index = fx.build();
    assert!(index.campaigns_by_pad(1).test(0));
    assert!(index.campaigns_by_pad(2).none());
}

#[test]
fn fully_filtered_campaign_has_no_partial_banners() {
    let mut fx = Fixture::default();
    fx.pads = "pad_id\n1\n".into();
    fx.users = "id parent_user_id\n10 0\n".into();
    fx.campaigns = "id user_id package_id\n100 10 1000\n".into();
    fx.targeting_campaign = "campaign_id pad_id type\n100 1 positive\n".into();
    fx.index = "Campaigns (id)\n1\n100\n\
                Banners (id, campaign_id)\n2\n1 100\n2 100\n\
                Campaign bitsets:\n2\n0 0\n1 0\n\
                Banner bitsets:\n1\n0 0\n\
                pad_id/full/any/banner:\n1\n1 0 1 0\n\
                Done\n"
        .into();

    let index = fx.build();
    assert!(index.campaigns_by_pad(1).none());
    assert!(index.filtered_banners_by_pad(1).is_empty());
}

#[test]
fn partially_filtered_campaign_blocks_only_the_failing_banner() {
    let mut fx = Fixture::default();
    fx.pads = "pad_id\n1\n".into();
    fx.users = "id parent_user_id\n10 0\n".into();
    fx.campaigns = "id user_id package_id\n100 10 1000\n".into();
    fx.targeting_campaign = "campaign_id pad_id type\n100 1 positive\n".into();
    // all=0 (campaign bitset id 0), any=1 bit set (bitset id 1), banners: banner 0 (id 1) passes, banner 1 (id 2) fails.
    fx.index = "Campaigns (id)\n1\n100\n\
                Banners (id, campaign_id)\n2\n1 100\n2 100\n\
                Campaign bitsets:\n2\n0 0\n1 1\n\
                Banner bitsets:\n1\n0 1\n\
                pad_id/full/any/banner:\n1\n1 0 1 0\n\
                Done\n"
        .into();

    let index = fx.build();
    assert!(index.campaigns_by_pad(1).test(0));
    assert_eq!(index.filtered_banners_by_pad(1).len(), 1);
    assert!(index.filtered_banners_by_pad(1).contains(&2));
    assert!(!index.filtered_banners_by_pad(1).contains(&1));
}

#[test]
fn pads_with_equal_effective_set_share_a_group() {
    let mut fx = Fixture::default();
    fx.pads = "pad_id\n0\n1\n2\n".into();
    fx.pad_relations = "pad_id parent_pad_id\n1 0\n2 0\n".into();
    fx.users = "id parent_user_id\n10 0\n".into();
    fx.campaigns = "id user_id package_id\n100 10 1000\n".into();
    fx.targeting_campaign = "campaign_id pad_id type\n100 0 positive\n".into();
    // a filter on pad 0 with a partially-filtered campaign, so both children
    // see the same non-empty cumulative filtered-banner set.
    fx.index = "Campaigns (id)\n1\n100\n\
                Banners (id, campaign_id)\n2\n1 100\n2 100\n\
                Campaign bitsets:\n2\n0 0\n1 1\n\
                Banner bitsets:\n1\n0 1\n\
                pad_id/full/any/banner:\n1\n0 0 1 0\n\
                Done\n"
        .into();

    let index = fx.build();
    let catalog = index.catalog();
    assert_eq!(catalog.pads[&1].effective_group_id, catalog.pads[&2].effective_group_id);
    // The group id is a real pad id from the group, not a synthetic counter.
    assert!(catalog.pads.contains_key(&catalog.pads[&1].effective_group_id));
    assert_eq!(index.filtered_banners_by_pad(1), index.filtered_banners_by_pad(2));
    assert!(index.filtered_banners_by_pad(1).contains(&2));
}
