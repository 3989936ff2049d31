//! Gap → fix strategy mapping. Pure.

use concord_core::enums::{FixStrategy, GapType};
use concord_core::reconcile::Gap;

/// A non-auto-fixable gap always maps to [`FixStrategy::Skip`].
#[must_use]
pub const fn select_strategy(gap: &Gap) -> FixStrategy {
    if !gap.auto_fixable {
        return FixStrategy::Skip;
    }
    match gap.gap_type {
        GapType::MissingRecord => FixStrategy::CopyFromSource,
        GapType::OrphanedRecord => FixStrategy::DeleteFromTarget,
        GapType::IncompleteMigration => FixStrategy::UpdateTarget,
        GapType::VersionConflict => FixStrategy::MergeData,
        GapType::SchemaMismatch => FixStrategy::Skip,
    }
}

/// Human-readable summary of what the strategy does to the gap's record.
#[must_use]
pub fn describe(gap: &Gap, strategy: FixStrategy) -> String {
    let (id, backend) = (&gap.record_id, &gap.backend);
    match strategy {
        FixStrategy::CopyFromSource => format!("copy {id} from the source of truth into {backend}"),
        FixStrategy::DeleteFromTarget => format!("delete orphaned {id} from {backend}"),
        FixStrategy::UpdateTarget => {
            format!("overwrite {id} in {backend} with the source of truth")
        }
        FixStrategy::MergeData => {
            format!("merge {id} between the source of truth and {backend}")
        }
        FixStrategy::Skip => format!("leave {id} in {backend} for manual review ({})", gap.gap_type),
    }
}
