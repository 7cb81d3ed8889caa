use serde::Serialize;

use super::calibration::Calibration;
use super::signal::SignalStream;

/// Indices of the five signals that formed a hit, into their streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitSignals {
    pub mcp: usize,
    /// Wire end 1 and 2 of the first layer of the pair
    pub first: [usize; 2],
    /// Wire end 1 and 2 of the second layer of the pair
    pub second: [usize; 2],
}

/// A reconstructed particle impact. Position in mm, time in ns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorHit {
    pub x: f64,
    pub y: f64,
    pub time: f64,
    pub signals: HitSignals,
}

impl DetectorHit {
    pub fn radius(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Reconstruct the hits of one event from the MCP and the four wire ends of a layer pair.
///
/// The wire ends are given as `[first end 1, first end 2, second end 1, second end 2]`.
/// MCP signals are visited in time order. For each unclaimed one the candidate
/// wire-end signals are enumerated in stream order and the first combination that
/// passes both timesum windows and lies inside the MCP radius becomes a hit. All
/// five signals of a hit are claimed before the next MCP signal is looked at, so no
/// signal ever contributes to two hits. The claims stay on the streams for the
/// caller to inspect.
pub fn reconstruct(
    mcp: &mut SignalStream,
    wire_ends: [&mut SignalStream; 4],
    calibration: &Calibration,
) -> Vec<DetectorHit> {
    let [f1, f2, s1, s2] = wire_ends;
    let mut hits = Vec::new();

    for mcp_idx in 0..mcp.len() {
        if mcp.is_used(mcp_idx) {
            continue;
        }
        let candidates = [&*f1, &*f2, &*s1, &*s2];
        let Some(hit) = find_hit(mcp_idx, mcp.time(mcp_idx), candidates, calibration) else {
            continue;
        };

        mcp.claim(hit.signals.mcp);
        f1.claim(hit.signals.first[0]);
        f2.claim(hit.signals.first[1]);
        s1.claim(hit.signals.second[0]);
        s2.claim(hit.signals.second[1]);
        hits.push(hit);
    }

    spdlog::trace!("Reconstructed {} hits from {} MCP signals", hits.len(), mcp.len());
    hits
}

/// First combination of unclaimed wire-end signals that forms a hit with the MCP signal
fn find_hit(
    mcp_idx: usize,
    mcp: f64,
    wire_ends: [&SignalStream; 4],
    calibration: &Calibration,
) -> Option<DetectorHit> {
    let [f1, f2, s1, s2] = wire_ends;
    let first = &calibration.first;
    let second = &calibration.second;

    let f1_range = f1.candidate_range(mcp, first.timesum.center(), calibration.runtime);
    let f2_range = f2.candidate_range(mcp, first.timesum.center(), calibration.runtime);
    let s1_range = s1.candidate_range(mcp, second.timesum.center(), calibration.runtime);
    let s2_range = s2.candidate_range(mcp, second.timesum.center(), calibration.runtime);

    for i1 in f1_range {
        if f1.is_used(i1) {
            continue;
        }
        for i2 in f2_range.clone() {
            if f2.is_used(i2) {
                continue;
            }
            // All conditions must hold, so rejecting on the first layer here picks
            // the same combination as checking everything innermost.
            let sum_first = f1.time(i1) + f2.time(i2) - 2.0 * mcp;
            if !first.timesum.contains(sum_first) {
                continue;
            }
            for j1 in s1_range.clone() {
                if s1.is_used(j1) {
                    continue;
                }
                for j2 in s2_range.clone() {
                    if s2.is_used(j2) {
                        continue;
                    }
                    let sum_second = s1.time(j1) + s2.time(j2) - 2.0 * mcp;
                    if !second.timesum.contains(sum_second) {
                        continue;
                    }

                    let a = first.value(f1.time(i1), f2.time(i2));
                    let b = second.value(s1.time(j1), s2.time(j2));
                    let (x, y) = calibration.calculator.compute(a, b);
                    if x.hypot(y) >= calibration.max_radius {
                        continue;
                    }

                    return Some(DetectorHit {
                        x,
                        y,
                        time: mcp,
                        signals: HitSignals {
                            mcp: mcp_idx,
                            first: [i1, i2],
                            second: [j1, j2],
                        },
                    });
                }
            }
        }
    }
    None
}
