use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::sampling::{random_weights, MAX_WEIGHT};
use crate::Result;

/// Categories that take part in every global item list.
pub const ALLOWED_ITEM_CATS: &[u8] = &[
    0, // Thrown - Pierce
    1, // Thrown - Rock
    2, // Berries, Seeds, Vitamins
    3, // Foods, Gummies
    4, // Hold
    5, // TMs
    8, // Orbs
    9, // Others
];

pub const CAT_MONEY: u8 = 6;
pub const CAT_LINK_BOX: u8 = 10;

/// Categories that join a list with a 1 in 8 chance each.
pub const OPTIONAL_ITEM_CATS: &[u8] = &[CAT_MONEY, CAT_LINK_BOX];

pub const MIN_ITEMS_PER_CAT: usize = 4;
pub const MAX_ITEMS_PER_CAT: usize = 18;

/// Number of global item lists stored in an image.
pub const ITEM_LIST_COUNT: usize = 25;

/// Read-only lookup of the items a category can hold.
pub trait CategoryCatalog {
    /// `None` for categories without individual items, such as money.
    fn item_pool(&self, category: u8) -> Option<&[u16]>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    categories: BTreeMap<u8, Option<Vec<u16>>>,
}

impl StaticCatalog {
    pub fn new(categories: BTreeMap<u8, Option<Vec<u16>>>) -> Self {
        Self { categories }
    }

    /// Vanilla item id blocks per category.
    pub fn builtin() -> Self {
        let ranges: &[(u8, Option<(u16, u16)>)] = &[
            (0, Some((1, 9))),
            (1, Some((10, 11))),
            (2, Some((69, 107))),
            (3, Some((109, 138))),
            (4, Some((13, 68))),
            (5, Some((188, 250))),
            (CAT_MONEY, None),
            (8, Some((301, 359))),
            (9, Some((139, 186))),
            (CAT_LINK_BOX, Some((362, 362))),
        ];

        let categories = ranges
            .iter()
            .map(|&(cat, range)| (cat, range.map(|(lo, hi)| (lo..=hi).collect())))
            .collect();
        Self { categories }
    }

    /// Every item id held by any category, ascending.
    pub fn item_ids(&self) -> Vec<u16> {
        let ids: BTreeSet<u16> = self
            .categories
            .values()
            .flatten()
            .flat_map(|pool| pool.iter().copied())
            .collect();
        ids.into_iter().collect()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CategoryCatalog for StaticCatalog {
    fn item_pool(&self, category: u8) -> Option<&[u16]> {
        self.categories
            .get(&category)
            .and_then(|pool| pool.as_deref())
    }
}

/// User-facing filter applied to the item universe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemRules {
    pub excluded: Vec<u16>,
}

/// Item ids the generator may place in a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedItems {
    ids: BTreeSet<u16>,
}

impl AllowedItems {
    pub fn new(ids: impl IntoIterator<Item = u16>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn from_rules(universe: impl IntoIterator<Item = u16>, rules: &ItemRules) -> Self {
        let excluded: BTreeSet<u16> = rules.excluded.iter().copied().collect();
        Self::new(universe.into_iter().filter(|id| !excluded.contains(id)))
    }

    pub fn contains(&self, id: u16) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// One global item list: category weights and item weights, both keyed
/// by id. A category weight of 0 means the category never rolls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    pub categories: BTreeMap<u8, u16>,
    pub items: BTreeMap<u16, u16>,
}

pub fn randomize_item_list<R, C>(rng: &mut R, catalog: &C, allowed: &AllowedItems) -> Result<ItemList>
where
    R: Rng + ?Sized,
    C: CategoryCatalog + ?Sized,
{
    let mut active: Vec<u8> = ALLOWED_ITEM_CATS.to_vec();
    for &optional in OPTIONAL_ITEM_CATS {
        if rng.gen_ratio(1, 8) {
            active.push(optional);
        }
    }
    active.sort_unstable();

    // Weights go to categories by sorted position, not at random.
    let mut weights = random_weights(rng, MAX_WEIGHT, active.len())?;
    weights.sort_unstable();

    let mut list = ItemList::default();
    for (&category, &weight) in active.iter().zip(&weights) {
        let weight = match catalog.item_pool(category) {
            None => weight,
            Some(pool) => {
                let picked = pick_category_items(rng, pool, allowed);
                if picked.is_empty() {
                    debug!("category {} has no allowed items, disabling it", category);
                    0
                } else {
                    let mut item_weights = random_weights(rng, MAX_WEIGHT, picked.len())?;
                    item_weights.sort_unstable();
                    list.items.extend(picked.into_iter().zip(item_weights));
                    weight
                }
            }
        };
        list.categories.insert(category, weight);
    }

    Ok(list)
}

pub fn randomize_item_lists<R, C>(
    rng: &mut R,
    catalog: &C,
    allowed: &AllowedItems,
    count: usize,
) -> Result<Vec<ItemList>>
where
    R: Rng + ?Sized,
    C: CategoryCatalog + ?Sized,
{
    (0..count)
        .map(|_| randomize_item_list(rng, catalog, allowed))
        .collect()
}

/// Picks between `MIN_ITEMS_PER_CAT` and `MAX_ITEMS_PER_CAT` distinct
/// allowed items from `pool`, ascending. Pools smaller than the minimum
/// are taken whole.
fn pick_category_items<R: Rng + ?Sized>(rng: &mut R, pool: &[u16], allowed: &AllowedItems) -> Vec<u16> {
    let mut eligible: Vec<u16> = pool.iter().copied().filter(|&id| allowed.contains(id)).collect();
    eligible.sort_unstable();
    eligible.dedup();

    if eligible.is_empty() {
        return eligible;
    }

    let upper_limit = MAX_ITEMS_PER_CAT.min(eligible.len());
    let n_items = if upper_limit <= MIN_ITEMS_PER_CAT {
        MIN_ITEMS_PER_CAT
    } else {
        rng.gen_range(MIN_ITEMS_PER_CAT..upper_limit)
    };

    let mut picked: Vec<u16> = eligible.choose_multiple(rng, n_items).copied().collect();
    picked.sort_unstable();
    picked
}
