//! The voxel-mask evaluation engine.
//!
//! Pure function from two binary volumes to an analysis-ready
//! [`EvaluationRecord`]: no I/O, no state, safe to call concurrently on
//! independent inputs. The edge-case tie-breaks here are deliberate and
//! load-bearing for reproducible scoring; see the tests.

use crate::error::TrainerError;
use crate::model::EvaluationRecord;
use crate::volume::{Volume, FOREGROUND_THRESHOLD};

/// Score a student mask against the gold mask.
///
/// Physical-space quantities (voxel volume, ml, centroid distance) use the
/// gold volume's spacing and affine — the geometry the gold annotation was
/// written in. Fails with `ShapeMismatch` before any computation when the
/// spatial dimensions disagree.
pub fn evaluate(gold: &Volume, student: &Volume) -> Result<EvaluationRecord, TrainerError> {
    if gold.shape != student.shape {
        return Err(TrainerError::ShapeMismatch {
            left: gold.shape,
            right: student.shape,
        });
    }

    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut fn_ = 0u64;
    for (g, s) in gold.data.iter().zip(student.data.iter()) {
        let gb = *g > FOREGROUND_THRESHOLD;
        let sb = *s > FOREGROUND_THRESHOLD;
        match (gb, sb) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    let total = gold.voxel_count() as u64;
    let tn = total - tp - fp - fn_;

    let gold_voxels = tp + fn_;
    let student_voxels = tp + fp;
    let mismatch_voxels = fp + fn_;

    // Both masks empty counts as perfect agreement.
    let dice_denom = 2 * tp + fp + fn_;
    let dice = if dice_denom > 0 {
        2.0 * tp as f64 / dice_denom as f64
    } else {
        1.0
    };

    let jaccard_denom = tp + fp + fn_;
    let jaccard = if jaccard_denom > 0 {
        tp as f64 / jaccard_denom as f64
    } else {
        1.0
    };

    let precision = if tp + fp > 0 {
        tp as f64 / (tp + fp) as f64
    } else if gold_voxels == 0 {
        1.0
    } else {
        0.0
    };
    let recall = if tp + fn_ > 0 {
        tp as f64 / (tp + fn_) as f64
    } else {
        1.0
    };
    let specificity = if tn + fp > 0 {
        tn as f64 / (tn + fp) as f64
    } else {
        1.0
    };
    let accuracy = if total > 0 {
        (tp + tn) as f64 / total as f64
    } else {
        1.0
    };

    let vox_mm3 = gold.header().voxel_volume_mm3();
    let gold_ml = gold_voxels as f64 * vox_mm3 / 1000.0;
    let student_ml = student_voxels as f64 * vox_mm3 / 1000.0;
    let vol_abs_err_ml = (student_ml - gold_ml).abs();
    // Zero-gold tie-break: 0.0 when the student is also empty, else 1.0 —
    // avoids division by zero while still penalizing false positives.
    let vol_rel_err = if gold_ml > 0.0 {
        (student_ml - gold_ml) / gold_ml
    } else if student_ml == 0.0 {
        0.0
    } else {
        1.0
    };

    // Centroid distance is undefined (absent, not zero) for empty masks.
    // Both centroids map through the gold affine.
    let centroid_dist_mm = match (gold.foreground_centroid(), student.foreground_centroid()) {
        (Some(cg), Some(cs)) => {
            let g = gold.apply_affine(cg);
            let s = gold.apply_affine(cs);
            let d = [g[0] - s[0], g[1] - s[1], g[2] - s[2]];
            Some((d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt())
        }
        _ => None,
    };

    Ok(EvaluationRecord {
        dice,
        jaccard,
        precision,
        recall,
        specificity,
        accuracy,
        tp,
        fp,
        fn_,
        tn,
        gold_voxels,
        student_voxels,
        mismatch_voxels,
        vox_mm3,
        gold_ml,
        student_ml,
        vol_abs_err_ml,
        vol_rel_err,
        centroid_dist_mm,
    })
}
