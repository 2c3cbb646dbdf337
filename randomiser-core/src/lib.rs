use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub mod host;
pub mod iq;
pub mod items;
pub mod sampling;

use host::{ensure_patch, FieldArrays, Patch, PatchAvailability};
use items::{randomize_item_list, AllowedItems, CategoryCatalog, ItemRules, ITEM_LIST_COUNT};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IqSettings {
    pub randomize_tactics: bool,
    pub randomize_iq_gain: bool,
    pub randomize_iq_groups: bool,
    pub randomize_iq_skills: bool,
}

impl IqSettings {
    pub fn any(&self) -> bool {
        self.randomize_tactics
            || self.randomize_iq_gain
            || self.randomize_iq_groups
            || self.randomize_iq_skills
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomiserSettings {
    pub seed: u64,
    pub global_items: bool,
    pub iq: IqSettings,
    pub items: ItemRules,
}

impl RandomiserSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("cannot place {count} values at least {min_distance} apart within 0..={upper_bound}")]
    InsufficientRange {
        upper_bound: u32,
        count: usize,
        min_distance: u32,
    },
    #[error("{field}: expected {expected} entries, got {actual}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// What a run wrote back to the image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub patches_applied: Vec<Patch>,
    pub item_lists_written: usize,
    pub tactics_written: usize,
    pub iq_gains_written: bool,
    pub iq_groups_written: usize,
    pub iq_skills_written: usize,
}

// Every step seeds its own generator so enabling one step never shifts
// the output of another.
const GLOBAL_ITEMS_SALT: u64 = 0x1735_9A0B_u64;
const TACTICS_SALT: u64 = 0x7AC7_1C50_u64;
const IQ_GAIN_SALT: u64 = 0x6A11_0E15_u64;
const IQ_GROUPS_SALT: u64 = 0x6C0F_F1E5_u64;
const IQ_SKILLS_SALT: u64 = 0x5C11_15E5_u64;

fn step_rng(seed: u64, salt: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ salt)
}

fn require_patch<H>(host: &mut H, patch: Patch, summary: &mut RunSummary) -> Result<()>
where
    H: PatchAvailability + ?Sized,
{
    if ensure_patch(host, patch)? {
        info!("Applied patch {}", patch.name());
        summary.patches_applied.push(patch);
    }
    Ok(())
}

pub fn run<H, C>(settings: &RandomiserSettings, catalog: &C, host: &mut H) -> Result<RunSummary>
where
    H: FieldArrays + PatchAvailability + ?Sized,
    C: CategoryCatalog + ?Sized,
{
    let mut summary = RunSummary::default();

    if settings.global_items {
        randomize_global_items(settings, catalog, host, &mut summary)?;
    }

    if settings.iq.any() {
        randomize_iq_tables(settings, host, &mut summary)?;
    }

    info!(
        "Done: {} item lists, {} tactics, {} IQ groups, {} IQ skills",
        summary.item_lists_written,
        summary.tactics_written,
        summary.iq_groups_written,
        summary.iq_skills_written
    );
    Ok(summary)
}

fn randomize_global_items<H, C>(
    settings: &RandomiserSettings,
    catalog: &C,
    host: &mut H,
    summary: &mut RunSummary,
) -> Result<()>
where
    H: FieldArrays + PatchAvailability + ?Sized,
    C: CategoryCatalog + ?Sized,
{
    require_patch(host, Patch::ActorAndLevelLoader, summary)?;
    require_patch(host, Patch::ExtractHardcodedItemLists, summary)?;

    let allowed = AllowedItems::from_rules(catalog_item_ids(catalog), &settings.items);
    info!("Randomizing global item lists ({} allowed items)...", allowed.len());

    let mut rng = step_rng(settings.seed, GLOBAL_ITEMS_SALT);
    for index in 0..ITEM_LIST_COUNT {
        let list = randomize_item_list(&mut rng, catalog, &allowed)?;
        debug!(
            "item list {:02}: {} categories, {} items",
            index,
            list.categories.len(),
            list.items.len()
        );
        host.set_item_list(index, &list)?;
        summary.item_lists_written += 1;
    }
    Ok(())
}

/// Item ids found in any category the generator may roll.
fn catalog_item_ids<C: CategoryCatalog + ?Sized>(catalog: &C) -> Vec<u16> {
    let mut ids: Vec<u16> = items::ALLOWED_ITEM_CATS
        .iter()
        .chain(items::OPTIONAL_ITEM_CATS)
        .filter_map(|&cat| catalog.item_pool(cat))
        .flatten()
        .copied()
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn randomize_iq_tables<H>(settings: &RandomiserSettings, host: &mut H, summary: &mut RunSummary) -> Result<()>
where
    H: FieldArrays + PatchAvailability + ?Sized,
{
    let additional_types = host.is_applied(Patch::AddTypes)?;
    if settings.iq.randomize_iq_groups {
        require_patch(host, Patch::CompressIqData, summary)?;
    }

    if settings.iq.randomize_tactics {
        info!("Randomizing tactics...");
        let mut rng = step_rng(settings.seed, TACTICS_SALT);
        let levels = iq::randomize_tactics(&mut rng, &host.tactic_unlock_levels()?);
        host.set_tactic_unlock_levels(&levels)?;
        summary.tactics_written = levels.len();
    }

    if settings.iq.randomize_iq_gain {
        info!("Randomizing IQ gain...");
        let mut rng = step_rng(settings.seed, IQ_GAIN_SALT);
        let tables = iq::randomize_iq_gains(&mut rng, &host.iq_gain_tables(additional_types)?);
        host.set_iq_gain_tables(&tables, additional_types)?;
        summary.iq_gains_written = true;
    }

    if settings.iq.randomize_iq_groups {
        info!("Randomizing IQ groups...");
        let mut rng = step_rng(settings.seed, IQ_GROUPS_SALT);
        let skill_count = host.iq_skill_requirements()?.len();
        let groups = iq::randomize_iq_groups(&mut rng, host.iq_group_count()?, skill_count)?;
        host.set_iq_groups(&groups)?;
        summary.iq_groups_written = groups.len();
    }

    if settings.iq.randomize_iq_skills {
        info!("Randomizing IQ skills...");
        let mut rng = step_rng(settings.seed, IQ_SKILLS_SALT);
        let requirements = iq::randomize_iq_skills(&mut rng, &host.iq_skill_requirements()?);
        host.set_iq_skill_requirements(&requirements)?;
        summary.iq_skills_written = requirements.len();
    }

    Ok(())
}
