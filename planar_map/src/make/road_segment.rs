use geom::{Distance, InfiniteLine, Line, Pt2D, EPSILON_DIST};
use tagged_map::{NodeID, WayID};

use crate::{ExportOptions, GraphNodeID};

/// Points round their coordinates to 0.1mm, which can push a clamped apex slightly further out.
/// Clamping aims this much short of the limit to leave room for that.
const CLAMP_MARGIN: f64 = 1e-4;

/// One span of a road centerline between two consecutive nodes, with the kerb apexes found at
/// each end so far. Left and right are as seen from the end in question, looking along the
/// segment.
pub(crate) struct RoadSegment {
    pub way: WayID,
    pub head: NodeID,
    pub tail: NodeID,
    pub width: Distance,
    /// From head to tail
    center: Line,

    head_left: Option<GraphNodeID>,
    head_right: Option<GraphNodeID>,
    tail_left: Option<GraphNodeID>,
    tail_right: Option<GraphNodeID>,
    /// When the end of the road is cut into a shape, the boundary vertices between the kerbs.
    head_apexes: Option<Vec<GraphNodeID>>,
    tail_apexes: Option<Vec<GraphNodeID>>,
}

impl RoadSegment {
    /// None if both ends are at the same spot.
    pub fn new(
        way: WayID,
        head: NodeID,
        head_pt: Pt2D,
        tail: NodeID,
        tail_pt: Pt2D,
        width: Distance,
    ) -> Option<RoadSegment> {
        let center = Line::maybe_new(head_pt, tail_pt)?;
        Some(RoadSegment {
            way,
            head,
            tail,
            width,
            center,
            head_left: None,
            head_right: None,
            tail_left: None,
            tail_right: None,
            head_apexes: None,
            tail_apexes: None,
        })
    }

    pub fn other_end(&self, n: NodeID) -> NodeID {
        if n == self.head {
            self.tail
        } else {
            self.head
        }
    }

    pub fn endpoint(&self, n: NodeID) -> Pt2D {
        self.centerline(n).pt1()
    }

    /// The centerline, starting at `origin`.
    pub fn centerline(&self, origin: NodeID) -> Line {
        if origin == self.head {
            self.center
        } else {
            self.center.reversed()
        }
    }

    /// The centerline from `origin` shifted sideways. Positive offsets go left.
    pub fn kerb(&self, origin: NodeID, offset: Distance) -> Line {
        self.centerline(origin).shift_left(offset)
    }

    pub fn left_kerb(&self, origin: NodeID) -> Line {
        self.kerb(origin, self.width / 2.0)
    }

    pub fn right_kerb(&self, origin: NodeID) -> Line {
        self.kerb(origin, -self.width / 2.0)
    }

    /// Clockwise from north, in [0, 2pi), looking away from `origin`.
    pub fn bearing_from(&self, origin: NodeID) -> f64 {
        self.centerline(origin)
            .vector()
            .bearing()
            .normalized_radians()
    }

    pub fn set_left(&mut self, n: NodeID, apex: GraphNodeID) {
        if n == self.head {
            self.head_left = Some(apex);
        } else {
            self.tail_right = Some(apex);
        }
    }

    pub fn set_right(&mut self, n: NodeID, apex: GraphNodeID) {
        if n == self.head {
            self.head_right = Some(apex);
        } else {
            self.tail_left = Some(apex);
        }
    }

    /// The apexes at one end, from the right kerb to the left kerb.
    pub fn set_end_apexes(&mut self, n: NodeID, apexes: Vec<GraphNodeID>) {
        if n == self.head {
            self.head_apexes = Some(apexes);
        } else {
            self.tail_apexes = Some(apexes);
        }
    }

    /// The outline of the road segment, going around from the head's right kerb. Ends that were
    /// never resolved fall back to the given centerline vertices.
    pub fn apexes(&self, head: GraphNodeID, tail: GraphNodeID) -> Vec<GraphNodeID> {
        let mut result = Vec::new();

        let hl = self.head_left.unwrap_or(head);
        let hr = self.head_right.unwrap_or(head);
        match self.head_apexes {
            Some(ref apexes) if apexes.len() >= 2 => result.extend(apexes.iter().cloned()),
            _ => {
                if hr != hl {
                    result.push(hr);
                }
                result.push(hl);
            }
        }

        let tl = self.tail_left.unwrap_or(tail);
        let tr = self.tail_right.unwrap_or(tail);
        match self.tail_apexes {
            Some(ref apexes) if apexes.len() >= 2 => result.extend(apexes.iter().cloned()),
            _ => {
                if tl != tr {
                    result.push(tl);
                }
                result.push(tr);
            }
        }
        result
    }

    /// Where this segment's right kerb meets the left kerb of `next`, the following segment
    /// clockwise around `origin`. The kerb of the wider road is the primary line.
    ///
    /// The result is never further from `origin` than `junction_clamp_factor` times the wider
    /// half-width, measured along either centerline.
    pub fn intersect(&self, next: &RoadSegment, origin: NodeID, opts: &ExportOptions) -> Pt2D {
        let (l1, l2) = if self.width >= next.width {
            (self.right_kerb(origin), next.left_kerb(origin))
        } else {
            (next.left_kerb(origin), self.right_kerb(origin))
        };
        let limit = self.width.max(next.width).inner_meters() / 2.0 * opts.junction_clamp_factor;
        let pt = kerb_meeting_point(&l1, &l2, limit, opts.parallel_cos_threshold);
        self.clamp_to_junction(next, origin, pt, limit)
    }

    fn clamp_to_junction(
        &self,
        next: &RoadSegment,
        origin: NodeID,
        pt: Pt2D,
        limit: f64,
    ) -> Pt2D {
        let center = self.endpoint(origin);
        let offset = pt - center;
        let along = self
            .centerline(origin)
            .direction()
            .dot(offset)
            .abs()
            .max(next.centerline(origin).direction().dot(offset).abs());
        if along <= limit {
            return pt;
        }
        center + offset * ((limit - CLAMP_MARGIN).max(0.0) / along)
    }
}

/// Where two kerbs meet, starting from the junction. Each kerb runs away from the junction.
fn kerb_meeting_point(l1: &Line, l2: &Line, limit: f64, parallel_cos: f64) -> Pt2D {
    let midpoint = Pt2D::center(&[l1.pt1(), l2.pt1()]);
    match l1.infinite().cos_angle(&l2.infinite()) {
        Some(cos) if cos.abs() < parallel_cos - EPSILON_DIST => {}
        _ => {
            return midpoint;
        }
    }
    let (t1, t2) = match l1.infinite().intersection_params(&l2.infinite()) {
        Some(params) => params,
        None => {
            return midpoint;
        }
    };

    if t1 > 1.0 && t2 > 1.0 {
        // Both kerbs end before meeting. Use where the caps at their far ends cross instead.
        let cap1 = InfiniteLine::new(l1.pt2(), l1.left_normal());
        let cap2 = InfiniteLine::new(l2.pt2(), l2.left_normal());
        return match cap1.intersection(&cap2) {
            Some(pt) => pt,
            None => {
                warn!("Kerb end caps at {} and {} don't meet", l1.pt2(), l2.pt2());
                midpoint
            }
        };
    }

    if t2 >= 1.0 {
        let t = 1.0_f64.min(limit / l2.length().inner_meters());
        return l2.percent_along(t);
    }
    let mut t = t1.min(1.0);
    let max_t = limit / l1.length().inner_meters();
    if t.abs() > max_t {
        t = max_t.copysign(t);
    }
    l1.percent_along(t)
}
