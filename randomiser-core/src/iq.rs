use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{RandomiserError, Result};

/// Unlock level of a tactic that is never learned.
pub const TACTIC_LOCKED: i32 = 999;
/// IQ requirement of a skill that can never be learned.
pub const IQ_SKILL_LOCKED: i32 = 9999;
/// Level/IQ value meaning "available from the start".
pub const ALWAYS_AVAILABLE: i32 = -1;
/// Skill every IQ group must grant.
pub const MANDATORY_IQ_SKILL: usize = 22;

/// Gummi and nectar IQ gain tables. The nested tables are indexed by
/// gummi type, then by the eater's type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IqGainTables {
    pub iq_gains: Vec<Vec<i32>>,
    pub belly_heal: Vec<Vec<i32>>,
    pub wonder_gummi_gain: i32,
    pub nectar_gain: i32,
    pub juice_bar_nectar_gain: i32,
}

impl IqGainTables {
    /// Row lengths of both nested tables.
    pub fn shape(&self) -> (Vec<usize>, Vec<usize>) {
        (
            self.iq_gains.iter().map(Vec::len).collect(),
            self.belly_heal.iter().map(Vec::len).collect(),
        )
    }
}

pub fn randomize_tactics<R: Rng + ?Sized>(rng: &mut R, unlock_levels: &[i32]) -> Vec<i32> {
    let mut levels: Vec<i32> = unlock_levels
        .iter()
        .map(|&level| {
            if level == TACTIC_LOCKED {
                level
            } else if rng.gen_ratio(1, 13) {
                ALWAYS_AVAILABLE
            } else {
                rng.gen_range(6..=50)
            }
        })
        .collect();

    ensure_unlocked_tactic(rng, &mut levels);
    levels
}

/// At least one tactic has to be usable from the start. If none is,
/// one open slot is picked and unlocked.
fn ensure_unlocked_tactic<R: Rng + ?Sized>(rng: &mut R, levels: &mut [i32]) {
    if levels.contains(&ALWAYS_AVAILABLE) {
        return;
    }

    let open: Vec<usize> = levels
        .iter()
        .enumerate()
        .filter(|(_, &level)| level != TACTIC_LOCKED)
        .map(|(idx, _)| idx)
        .collect();

    match open.choose(rng) {
        Some(&idx) => levels[idx] = ALWAYS_AVAILABLE,
        None => warn!("every tactic is locked, none can be unlocked from the start"),
    }
}

pub fn randomize_iq_gains<R: Rng + ?Sized>(rng: &mut R, current: &IqGainTables) -> IqGainTables {
    let iq_gains = current
        .iq_gains
        .iter()
        .map(|row| row.iter().map(|_| rng.gen_range(1..=5)).collect::<Vec<i32>>())
        .collect();
    let belly_heal = current
        .belly_heal
        .iter()
        .map(|row| row.iter().map(|_| rng.gen_range(10..=39)).collect::<Vec<i32>>())
        .collect();

    IqGainTables {
        iq_gains,
        belly_heal,
        wonder_gummi_gain: rng.gen_range(5..=19),
        nectar_gain: rng.gen_range(5..=19),
        juice_bar_nectar_gain: rng.gen_range(5..=19),
    }
}

/// New skill memberships for `group_count` IQ groups. Each group lists
/// skill indices ascending.
pub fn randomize_iq_groups<R: Rng + ?Sized>(
    rng: &mut R,
    group_count: usize,
    skill_count: usize,
) -> Result<Vec<Vec<usize>>> {
    if skill_count <= MANDATORY_IQ_SKILL {
        return Err(RandomiserError::Config(format!(
            "IQ skill table has {} entries, skill {} must exist",
            skill_count, MANDATORY_IQ_SKILL
        )));
    }

    Ok((0..group_count)
        .map(|_| {
            (0..skill_count)
                .filter(|&idx| idx == MANDATORY_IQ_SKILL || rng.gen_bool(0.5))
                .collect::<Vec<usize>>()
        })
        .collect())
}

pub fn randomize_iq_skills<R: Rng + ?Sized>(rng: &mut R, requirements: &[i32]) -> Vec<i32> {
    requirements
        .iter()
        .enumerate()
        .map(|(idx, &required)| {
            if required == IQ_SKILL_LOCKED {
                required
            } else if idx == MANDATORY_IQ_SKILL || rng.gen_ratio(1, 13) {
                ALWAYS_AVAILABLE
            } else {
                rng.gen_range(1..=899)
            }
        })
        .collect()
}
