use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::EntranceCandidate;
use crate::EntranceOptions;

/// One criterion for ordering entrance candidates. Stages are applied in order, and a later
/// stage only breaks ties left by all earlier ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingStage {
    /// Connectors leaving the wall and meeting the target roughly head-on come first.
    AlignedDirection,
    /// Roads come before buildings.
    RoadTarget,
    /// Targets that can already reach the main network come first.
    ConnectedTarget,
    /// Marked entrance nodes come before wall midpoints.
    MarkedEntrance,
    /// Shorter connectors first, unless `prefer_longer` is set.
    Length,
}

impl RankingStage {
    pub fn all() -> Vec<RankingStage> {
        vec![
            RankingStage::AlignedDirection,
            RankingStage::RoadTarget,
            RankingStage::ConnectedTarget,
            RankingStage::MarkedEntrance,
            RankingStage::Length,
        ]
    }

    /// Less means `a` is better.
    pub fn compare(
        self,
        a: &EntranceCandidate,
        b: &EntranceCandidate,
        opts: &EntranceOptions,
    ) -> Ordering {
        match self {
            RankingStage::AlignedDirection => {
                // A mismatch right at the threshold still counts
                let aligned =
                    |c: &EntranceCandidate| c.alignment() >= 1.0 - opts.deviation_threshold;
                prefer(aligned(a), aligned(b))
            }
            RankingStage::RoadTarget => prefer(a.target_is_road, b.target_is_road),
            RankingStage::ConnectedTarget => prefer(a.target_connected, b.target_connected),
            RankingStage::MarkedEntrance => prefer(a.building.marked, b.building.marked),
            RankingStage::Length => {
                let ord = a.length().cmp(&b.length());
                if opts.prefer_longer {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    }
}

fn prefer(a: bool, b: bool) -> Ordering {
    b.cmp(&a)
}

/// Sorts candidates best first. The sort is stable, so candidates tied on every stage keep the
/// order they were generated in.
pub(crate) fn rank(
    candidates: &mut Vec<EntranceCandidate>,
    stages: &[RankingStage],
    opts: &EntranceOptions,
) {
    candidates.sort_by(|a, b| {
        stages
            .iter()
            .map(|stage| stage.compare(a, b, opts))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}
