//! Access to the host image the tables live in.
//!
//! The generators only ever see plain vectors. Reading those vectors out of
//! a ROM, and applying the patches some tables need, belongs to whatever
//! implements [`FieldArrays`] and [`PatchAvailability`]. [`HostSnapshot`]
//! is an in-memory image stored as JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::items::{ItemList, StaticCatalog};
use crate::iq::IqGainTables;
use crate::{RandomiserError, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Patch {
    ActorAndLevelLoader,
    ExtractHardcodedItemLists,
    CompressIqData,
    AddTypes,
}

impl Patch {
    pub fn name(self) -> &'static str {
        match self {
            Patch::ActorAndLevelLoader => "ActorAndLevelLoader",
            Patch::ExtractHardcodedItemLists => "ExtractHardcodedItemLists",
            Patch::CompressIqData => "CompressIQData",
            Patch::AddTypes => "AddTypes",
        }
    }
}

pub trait PatchAvailability {
    fn is_applied(&self, patch: Patch) -> Result<bool>;
    fn apply(&mut self, patch: Patch) -> Result<()>;
}

/// Applies `patch` unless it is already present. Returns whether it had
/// to be applied.
pub fn ensure_patch<H: PatchAvailability + ?Sized>(host: &mut H, patch: Patch) -> Result<bool> {
    if host.is_applied(patch)? {
        return Ok(false);
    }
    host.apply(patch)?;
    Ok(true)
}

/// Fixed-length integer tables stored in the image. Setters must reject
/// values whose length differs from what is stored.
pub trait FieldArrays {
    fn tactic_unlock_levels(&self) -> Result<Vec<i32>>;
    fn set_tactic_unlock_levels(&mut self, levels: &[i32]) -> Result<()>;

    /// The gain tables are laid out differently once extra types exist.
    fn iq_gain_tables(&self, additional_types: bool) -> Result<IqGainTables>;
    fn set_iq_gain_tables(&mut self, tables: &IqGainTables, additional_types: bool) -> Result<()>;

    fn iq_skill_requirements(&self) -> Result<Vec<i32>>;
    fn set_iq_skill_requirements(&mut self, requirements: &[i32]) -> Result<()>;

    fn iq_group_count(&self) -> Result<usize>;
    fn set_iq_groups(&mut self, groups: &[Vec<usize>]) -> Result<()>;

    fn set_item_list(&mut self, index: usize, list: &ItemList) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSnapshot {
    pub applied_patches: BTreeSet<Patch>,
    pub tactic_unlock_levels: Vec<i32>,
    pub iq_gains: IqGainTables,
    /// Gain tables in the layout used once `AddTypes` is applied.
    pub iq_gains_extended: Option<IqGainTables>,
    pub iq_skill_requirements: Vec<i32>,
    pub iq_groups: Vec<Vec<usize>>,
    pub item_lists: Vec<ItemList>,
    pub catalog: StaticCatalog,
}

impl HostSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(RandomiserError::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_gain_shape(current: &IqGainTables, new: &IqGainTables) -> Result<()> {
    let (iq_rows, belly_rows) = current.shape();
    let (new_iq_rows, new_belly_rows) = new.shape();
    check_len("iq gain rows", iq_rows.len(), new_iq_rows.len())?;
    for (expected, actual) in iq_rows.into_iter().zip(new_iq_rows) {
        check_len("iq gain row", expected, actual)?;
    }
    check_len("belly heal rows", belly_rows.len(), new_belly_rows.len())?;
    for (expected, actual) in belly_rows.into_iter().zip(new_belly_rows) {
        check_len("belly heal row", expected, actual)?;
    }
    Ok(())
}

impl PatchAvailability for HostSnapshot {
    fn is_applied(&self, patch: Patch) -> Result<bool> {
        Ok(self.applied_patches.contains(&patch))
    }

    fn apply(&mut self, patch: Patch) -> Result<()> {
        if patch == Patch::AddTypes && self.iq_gains_extended.is_none() {
            return Err(RandomiserError::Config(
                "AddTypes needs gain tables in the extended layout".to_string(),
            ));
        }
        self.applied_patches.insert(patch);
        Ok(())
    }
}

impl FieldArrays for HostSnapshot {
    fn tactic_unlock_levels(&self) -> Result<Vec<i32>> {
        Ok(self.tactic_unlock_levels.clone())
    }

    fn set_tactic_unlock_levels(&mut self, levels: &[i32]) -> Result<()> {
        check_len("tactic unlock levels", self.tactic_unlock_levels.len(), levels.len())?;
        self.tactic_unlock_levels.copy_from_slice(levels);
        Ok(())
    }

    fn iq_gain_tables(&self, additional_types: bool) -> Result<IqGainTables> {
        if !additional_types {
            return Ok(self.iq_gains.clone());
        }
        self.iq_gains_extended.clone().ok_or_else(|| {
            RandomiserError::Config("image has no gain tables for additional types".to_string())
        })
    }

    fn set_iq_gain_tables(&mut self, tables: &IqGainTables, additional_types: bool) -> Result<()> {
        let target = if additional_types {
            self.iq_gains_extended.as_mut().ok_or_else(|| {
                RandomiserError::Config("image has no gain tables for additional types".to_string())
            })?
        } else {
            &mut self.iq_gains
        };
        check_gain_shape(target, tables)?;
        *target = tables.clone();
        Ok(())
    }

    fn iq_skill_requirements(&self) -> Result<Vec<i32>> {
        Ok(self.iq_skill_requirements.clone())
    }

    fn set_iq_skill_requirements(&mut self, requirements: &[i32]) -> Result<()> {
        check_len("iq skill requirements", self.iq_skill_requirements.len(), requirements.len())?;
        self.iq_skill_requirements.copy_from_slice(requirements);
        Ok(())
    }

    fn iq_group_count(&self) -> Result<usize> {
        Ok(self.iq_groups.len())
    }

    fn set_iq_groups(&mut self, groups: &[Vec<usize>]) -> Result<()> {
        check_len("iq groups", self.iq_groups.len(), groups.len())?;
        self.iq_groups = groups.to_vec();
        Ok(())
    }

    fn set_item_list(&mut self, index: usize, list: &ItemList) -> Result<()> {
        if index >= self.item_lists.len() {
            self.item_lists.resize_with(index + 1, ItemList::default);
        }
        self.item_lists[index] = list.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> HostSnapshot {
        HostSnapshot {
            tactic_unlock_levels: vec![-1, 999, 20],
            iq_gains: IqGainTables {
                iq_gains: vec![vec![1, 2], vec![3, 4]],
                belly_heal: vec![vec![10, 20], vec![30, 30]],
                ..Default::default()
            },
            iq_skill_requirements: vec![9999, 50],
            iq_groups: vec![vec![0], vec![1]],
            ..Default::default()
        }
    }

    #[test]
    fn ensure_patch_applies_once() {
        let mut host = snapshot();
        assert!(ensure_patch(&mut host, Patch::CompressIqData).unwrap());
        assert!(!ensure_patch(&mut host, Patch::CompressIqData).unwrap());
        assert!(host.is_applied(Patch::CompressIqData).unwrap());
    }

    #[test]
    fn add_types_needs_extended_tables() {
        let mut host = snapshot();
        assert!(host.apply(Patch::AddTypes).is_err());
        assert!(host.iq_gain_tables(true).is_err());
    }

    #[test]
    fn array_writes_keep_length() {
        let mut host = snapshot();
        host.set_tactic_unlock_levels(&[5, 999, -1]).unwrap();
        assert_eq!(host.tactic_unlock_levels, vec![5, 999, -1]);

        let err = host.set_tactic_unlock_levels(&[5, 999]).unwrap_err();
        assert!(matches!(
            err,
            RandomiserError::LengthMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert!(host.set_iq_skill_requirements(&[1, 2, 3]).is_err());
        assert!(host.set_iq_groups(&[vec![22]]).is_err());
    }

    #[test]
    fn gain_writes_keep_shape() {
        let mut host = snapshot();
        let mut tables = host.iq_gain_tables(false).unwrap();
        tables.iq_gains[1].push(5);
        assert!(host.set_iq_gain_tables(&tables, false).is_err());

        tables.iq_gains[1].pop();
        tables.nectar_gain = 7;
        host.set_iq_gain_tables(&tables, false).unwrap();
        assert_eq!(host.iq_gains.nectar_gain, 7);
    }

    #[test]
    fn item_lists_grow_to_fit() {
        let mut host = snapshot();
        host.set_item_list(3, &ItemList::default()).unwrap();
        assert_eq!(host.item_lists.len(), 4);
    }

    #[test]
    fn snapshot_reads_partial_json() {
        let host: HostSnapshot = serde_json::from_str(
            r#"{ "tactic_unlock_levels": [999, 10], "applied_patches": ["AddTypes"] }"#,
        )
        .unwrap();
        assert_eq!(host.tactic_unlock_levels, vec![999, 10]);
        assert!(host.is_applied(Patch::AddTypes).unwrap());
        assert_eq!(host.catalog, StaticCatalog::builtin());
    }
}
