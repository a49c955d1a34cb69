use serde::{Deserialize, Serialize};

use geom::Distance;
use maputil::Tags;

pub const DEFAULT_LANE_WIDTH_MM: u32 = 3000;
pub const SERVICE_DEFAULT_WIDTH_MM: u32 = 4000;
pub const SERVICE_DRIVEWAY_WIDTH_MM: u32 = 3000;
pub const FOOTWAY_WIDTH_MM: u32 = 2500;
pub const DEFAULT_ENTRANCE_WIDTH_MM: u32 = 3000;
pub const MINIMUM_ROAD_WIDTH_MM: u32 = 1500;

pub const DEFAULT_FLOORS: u32 = 3;
pub const DEFAULT_BUILDING_CODE: u32 = 0;

/// Nodes created while materializing an entrance carry these tags.
pub const AUTOGENERATED_ENTRANCE_TAGS: [(&str, &str); 2] =
    [("rcr:autogenerated", "entrance"), ("rcr:type", "node")];

/// What a way represents. Assigned once from its tags when the way enters the map.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WayKind {
    /// A road represented by its centerline.
    Road { width_mm: u32 },
    /// A closed way covering the whole surface of a road, like a plaza.
    AreaRoad,
    Building { floors: u32, code: u32 },
    /// Anything else. Ignored by planarization.
    Other,
}

impl WayKind {
    pub fn classify(tags: &Tags, closed: bool) -> WayKind {
        if tags.is("rcr:type", "road") {
            if has_area_tags(tags) {
                if closed {
                    return WayKind::AreaRoad;
                }
                warn!("Area road isn't closed, ignoring it");
                return WayKind::Other;
            }
            let width_mm = tags
                .get_u32("rcr:width")
                .unwrap_or_else(|| infer_width_mm(tags));
            return WayKind::Road { width_mm };
        }
        if tags.is("rcr:type", "building") {
            if !closed {
                warn!("Building outline isn't closed, ignoring it");
                return WayKind::Other;
            }
            return WayKind::Building {
                floors: tags.get_u32("rcr:floors").unwrap_or(DEFAULT_FLOORS),
                code: tags
                    .get_u32("rcr:building_code")
                    .unwrap_or(DEFAULT_BUILDING_CODE),
            };
        }
        WayKind::Other
    }

    /// Road centerlines and area roads
    pub fn is_road(self) -> bool {
        matches!(self, WayKind::Road { .. } | WayKind::AreaRoad)
    }

    pub fn is_centerline(self) -> bool {
        matches!(self, WayKind::Road { .. })
    }

    pub fn is_building(self) -> bool {
        matches!(self, WayKind::Building { .. })
    }

    /// Closed ways that become shapes of their own.
    pub fn is_area(self) -> bool {
        matches!(self, WayKind::AreaRoad | WayKind::Building { .. })
    }

    /// Roads and buildings; everything that takes part in connectivity.
    pub fn is_relevant(self) -> bool {
        self != WayKind::Other
    }

    pub fn width(self) -> Option<Distance> {
        match self {
            WayKind::Road { width_mm } => Some(Distance::millimeters(width_mm)),
            _ => None,
        }
    }
}

fn has_area_tags(tags: &Tags) -> bool {
    tags.is("area", "yes")
}

/// Estimates the width of a road without an explicit `rcr:width`, from `width` (in meters),
/// `highway`, `service`, `lanes` and `oneway`. Never narrower than `MINIMUM_ROAD_WIDTH_MM`.
pub fn infer_width_mm(tags: &Tags) -> u32 {
    if let Some(meters) = tags.get("width").and_then(|w| w.trim().parse::<f64>().ok()) {
        if meters.is_finite() && meters > 0.0 {
            return ((meters * 1000.0) as u32).max(MINIMUM_ROAD_WIDTH_MM);
        }
    }

    let (lane_width, additional) = if tags.is("highway", "footway") {
        (FOOTWAY_WIDTH_MM, 0)
    } else if tags.is("highway", "service") {
        if tags.is("service", "driveway") {
            (SERVICE_DRIVEWAY_WIDTH_MM, 0)
        } else {
            (SERVICE_DEFAULT_WIDTH_MM, 500)
        }
    } else {
        (DEFAULT_LANE_WIDTH_MM, 1000)
    };

    let lanes = if let Some(n) = tags.get_u32("lanes") {
        n.max(1)
    } else if tags.is("oneway", "yes") || tags.is_any("highway", vec!["service", "footway"]) {
        1
    } else {
        2
    };

    (lane_width * lanes + additional).max(MINIMUM_ROAD_WIDTH_MM)
}

/// Nodes that mark a door or an address on a building outline.
pub fn is_marked_entrance(tags: &Tags) -> bool {
    tags.contains_key("entrance")
        || tags.is("building", "entrance")
        || tags.has_any(vec!["addr:housenumber", "addr:housename"])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(kv: Vec<(&str, &str)>) -> Tags {
        kv.into_iter().collect()
    }

    #[test]
    fn classification() {
        assert_eq!(
            WayKind::classify(&tags(vec![("rcr:type", "road"), ("rcr:width", "4500")]), false),
            WayKind::Road { width_mm: 4500 }
        );
        assert_eq!(
            WayKind::classify(&tags(vec![("rcr:type", "road"), ("area", "yes")]), true),
            WayKind::AreaRoad
        );
        assert_eq!(
            WayKind::classify(&tags(vec![("rcr:type", "road"), ("area", "yes")]), false),
            WayKind::Other
        );
        assert_eq!(
            WayKind::classify(
                &tags(vec![("rcr:type", "building"), ("rcr:floors", "7")]),
                true
            ),
            WayKind::Building {
                floors: 7,
                code: DEFAULT_BUILDING_CODE
            }
        );
        assert_eq!(
            WayKind::classify(&tags(vec![("highway", "primary")]), false),
            WayKind::Other
        );
    }

    #[test]
    fn width_inference() {
        assert_eq!(infer_width_mm(&tags(vec![("highway", "residential")])), 7000);
        assert_eq!(infer_width_mm(&tags(vec![("highway", "footway")])), 2500);
        assert_eq!(
            infer_width_mm(&tags(vec![("highway", "service"), ("service", "driveway")])),
            3000
        );
        assert_eq!(infer_width_mm(&tags(vec![("highway", "service")])), 4500);
        assert_eq!(infer_width_mm(&tags(vec![("width", "0.5")])), MINIMUM_ROAD_WIDTH_MM);
        assert_eq!(
            infer_width_mm(&tags(vec![("highway", "primary"), ("lanes", "4")])),
            13000
        );
    }

    #[test]
    fn marked_entrances() {
        assert!(is_marked_entrance(&tags(vec![("entrance", "main")])));
        assert!(is_marked_entrance(&tags(vec![("addr:housenumber", "12")])));
        assert!(!is_marked_entrance(&tags(vec![("rcr:type", "node")])));
    }
}
