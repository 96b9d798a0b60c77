use std::collections::{BTreeSet, HashSet};
use std::ops::Bound::{Excluded, Unbounded};
use std::path::{Path, PathBuf};

use derive_more::{AddAssign, Display};
use snafu::{OptionExt, ResultExt};
use tracing::{debug, info, trace};

use crate::file_structure::{DirEntry, Entry, FileStructure, Snapshot};
use crate::filesystem::FileSystem;

use super::conflict_namer::{ConflictNamer, MAX_ATTEMPTS};
use super::decision::{Action, Attributes, Side, decide};
use super::{NameCollisionExhaustedSnafu, OperationSnafu, RefreshSnafu, SyncError};

/// Tally of the filesystem calls made by a synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AddAssign, Display)]
#[display("{copied} copied, {deleted} deleted, {renamed} renamed, {created} directories created")]
pub struct SyncReport {
    pub copied: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub created: usize,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    File,
    Dir,
}

/// The two trees of one reconciliation, addressed by [`Side`].
struct Pair<'s> {
    first: &'s FileStructure,
    second: &'s FileStructure,
}

impl Pair<'_> {
    fn structure(&self, side: Side) -> &FileStructure {
        match side {
            Side::First => self.first,
            Side::Second => self.second,
        }
    }

    fn absolute(&self, side: Side, relative: &Path) -> PathBuf {
        self.structure(side).absolute(relative)
    }
}

pub struct SyncManager<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> SyncManager<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Synchronizes every structure with every other one and returns the
    /// snapshot to persist as the next baseline.
    ///
    /// All structures must have been checked against `baseline`. The first
    /// one acts as the hub: it is reconciled with each other directory in
    /// turn, then once more with all of them but the last, so a change made
    /// anywhere reaches everywhere in a single call. Both trees of a pair are
    /// rebuilt and re-checked whenever an earlier pair may have touched them.
    pub fn synchronize(
        &self,
        structures: &mut [FileStructure],
        baseline: &DirEntry,
    ) -> Result<(Snapshot, SyncReport), SyncError> {
        let mut report = SyncReport::default();

        if let Some((hub, spokes)) = structures.split_first_mut() {
            let count = spokes.len();
            for (pass, index) in (0..count).chain(0..count.saturating_sub(1)).enumerate() {
                if pass > 0 {
                    self.rescan(hub, baseline)?;
                }
                let spoke = &mut spokes[index];
                if pass >= count {
                    self.rescan(spoke, baseline)?;
                }

                debug!(
                    "Reconciling {} with {}",
                    hub.path().display(),
                    spoke.path().display()
                );
                report += self.reconcile(hub, spoke)?;
            }
        }

        for structure in structures.iter_mut() {
            structure.refresh(self.fs).context(RefreshSnafu)?;
        }

        info!("Synchronization finished: {report}");
        Ok((Self::merged_snapshot(structures), report))
    }

    /// Applies the decision table to every path known to either tree.
    ///
    /// Paths are visited in sorted order, so a directory is always created
    /// before its contents are copied into it.
    pub fn reconcile(
        &self,
        first: &FileStructure,
        second: &FileStructure,
    ) -> Result<SyncReport, SyncError> {
        let pair = Pair { first, second };
        let all_first: HashSet<PathBuf> = first.all_entries().into_iter().collect();
        let all_second: HashSet<PathBuf> = second.all_entries().into_iter().collect();
        let updated_first: HashSet<PathBuf> = first.updated_entries().into_iter().collect();
        let updated_second: HashSet<PathBuf> = second.updated_entries().into_iter().collect();
        let union: BTreeSet<PathBuf> = all_first.iter().chain(&all_second).cloned().collect();

        let mut visited = HashSet::new();
        let mut report = SyncReport::default();

        for path in &union {
            if !visited.insert(path.clone()) {
                continue;
            }

            let in_first = all_first.contains(path);
            let in_second = all_second.contains(path);
            let kinds = (
                in_first.then(|| self.live_kind(&first.absolute(path))),
                in_second.then(|| self.live_kind(&second.absolute(path))),
            );

            let is_file = match kinds {
                (Some(None), _) | (_, Some(None)) => {
                    debug!("{} vanished during reconciliation, skipping", path.display());
                    Self::skip_descendants(&union, path, &mut visited);
                    continue;
                }
                (Some(Some(ours)), Some(Some(theirs))) if ours != theirs => {
                    debug!(
                        "{} is a {ours:?} in {} but a {theirs:?} in {}, leaving both untouched",
                        path.display(),
                        first.path().display(),
                        second.path().display()
                    );
                    Self::skip_descendants(&union, path, &mut visited);
                    continue;
                }
                (Some(Some(kind)), _) | (None, Some(Some(kind))) => kind == Kind::File,
                (None, None) => continue,
            };

            let attributes = Attributes {
                is_file,
                in_first,
                in_second,
                updated_first: updated_first.contains(path),
                updated_second: updated_second.contains(path),
            };

            if attributes.is_conflict() && self.same_contents(&pair, path)? {
                debug!("{} already agrees on both sides", path.display());
                continue;
            }

            let Some(action) = decide(attributes) else {
                trace!("{}: {attributes:?}, nothing to do", path.display());
                continue;
            };
            debug!("{}: {attributes:?} -> {action:?}", path.display());

            report += self.apply(&pair, path, action)?;
            if matches!(action, Action::RemoveTree { .. }) {
                Self::skip_descendants(&union, path, &mut visited);
            }
        }

        Ok(report)
    }

    /// Paths holding a file in one tree and a directory in another.
    /// [`Self::reconcile`] leaves these and everything below them alone, so
    /// they are never pending work.
    pub fn kind_mismatches(structures: &[FileStructure]) -> BTreeSet<PathBuf> {
        let paths: BTreeSet<PathBuf> = structures
            .iter()
            .flat_map(FileStructure::all_entries)
            .collect();

        paths
            .into_iter()
            .filter(|path| {
                let kinds: HashSet<bool> = structures
                    .iter()
                    .filter_map(|structure| structure.entry_at(path))
                    .map(Entry::is_file)
                    .collect();
                kinds.len() > 1
            })
            .collect()
    }

    /// Folds the trees into one, keeping the newest time at shared paths.
    pub fn merged_snapshot(structures: &[FileStructure]) -> Snapshot {
        let mut merged = DirEntry::default();
        for structure in structures {
            merged.merge_latest(structure.root());
        }
        Snapshot::from(&merged)
    }

    fn rescan(&self, structure: &mut FileStructure, baseline: &DirEntry) -> Result<(), SyncError> {
        structure.refresh(self.fs).context(RefreshSnafu)?;
        structure.check(baseline);
        Ok(())
    }

    fn live_kind(&self, path: &Path) -> Option<Kind> {
        if self.fs.is_file(path) {
            Some(Kind::File)
        } else if self.fs.is_dir(path) {
            Some(Kind::Dir)
        } else {
            None
        }
    }

    fn same_contents(&self, pair: &Pair<'_>, path: &Path) -> Result<bool, SyncError> {
        let ours = pair.absolute(Side::First, path);
        let theirs = pair.absolute(Side::Second, path);
        self.fs
            .same_contents(&ours, &theirs)
            .context(OperationSnafu {
                action: "compare",
                path: &ours,
            })
    }

    /// Marks everything below `path` as visited. Descendants sort directly
    /// after their parent, so the walk stops at the first non-descendant.
    fn skip_descendants(union: &BTreeSet<PathBuf>, path: &Path, visited: &mut HashSet<PathBuf>) {
        visited.extend(
            union
                .range::<Path, _>((Excluded(path), Unbounded))
                .take_while(|candidate| candidate.starts_with(path))
                .cloned(),
        );
    }

    fn apply(&self, pair: &Pair<'_>, path: &Path, action: Action) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();

        match action {
            Action::CopyFile { from } => {
                self.copy(&pair.absolute(from, path), &pair.absolute(from.other(), path))?;
                report.copied += 1;
            }
            Action::DeleteFile { from } => {
                self.remove_file(&pair.absolute(from, path))?;
                report.deleted += 1;
            }
            Action::ReplaceFile { from } => {
                let target = pair.absolute(from.other(), path);
                self.remove_file(&target)?;
                self.copy(&pair.absolute(from, path), &target)?;
                report.deleted += 1;
                report.copied += 1;
            }
            Action::ResolveConflict => report += self.resolve_conflict(pair, path)?,
            Action::CreateDir { on } => {
                let target = pair.absolute(on, path);
                info!("Creating directory {}", target.display());
                self.fs
                    .create_dir(&target, false)
                    .context(OperationSnafu {
                        action: "create",
                        path: &target,
                    })?;
                report.created += 1;
            }
            Action::RemoveTree { from } => {
                let target = pair.absolute(from, path);
                info!("Removing directory {}", target.display());
                self.fs.remove_tree(&target).context(OperationSnafu {
                    action: "remove",
                    path: &target,
                })?;
                report.deleted += 1;
            }
        }

        Ok(report)
    }

    /// Moves both versions aside under timestamped names, then copies each
    /// one to the other side so both directories end up holding both.
    fn resolve_conflict(&self, pair: &Pair<'_>, path: &Path) -> Result<SyncReport, SyncError> {
        let name = self.fs.name(path).unwrap_or_default();
        let parent = path.parent().unwrap_or(Path::new(""));
        let mut renamed = Vec::with_capacity(2);

        for side in [Side::First, Side::Second] {
            let source = pair.absolute(side, path);
            let modified = pair
                .structure(side)
                .entry_at(path)
                .map(Entry::modified)
                .unwrap_or_default();

            let candidate = ConflictNamer::generate_unique(&name, modified, |candidate| {
                let relative = parent.join(candidate);
                [Side::First, Side::Second]
                    .into_iter()
                    .any(|side| self.fs.exists(&pair.absolute(side, &relative)))
            })
            .context(NameCollisionExhaustedSnafu {
                path: &source,
                attempts: MAX_ATTEMPTS,
            })?;

            let relative = parent.join(candidate);
            let target = pair.absolute(side, &relative);
            info!(
                "Conflict on {}: keeping {} as {}",
                path.display(),
                source.display(),
                target.display()
            );
            self.fs.rename(&source, &target).context(OperationSnafu {
                action: "rename",
                path: &source,
            })?;
            renamed.push((side, relative));
        }

        for (side, relative) in &renamed {
            self.copy(
                &pair.absolute(*side, relative),
                &pair.absolute(side.other(), relative),
            )?;
        }

        Ok(SyncReport {
            copied: renamed.len(),
            renamed: renamed.len(),
            ..SyncReport::default()
        })
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), SyncError> {
        info!("Copying {} to {}", from.display(), to.display());
        self.fs
            .copy_file(from, to)
            .context(OperationSnafu { action: "copy", path: from })
    }

    fn remove_file(&self, path: &Path) -> Result<(), SyncError> {
        info!("Deleting {}", path.display());
        self.fs
            .remove_file(path)
            .context(OperationSnafu { action: "delete", path })
    }
}
