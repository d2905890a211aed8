// src/config/locations.rs
use serde::Serialize;

/// A selectable place. The id doubles as the electricity price zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub id: &'static str,
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn price_zone(&self) -> &'static str {
        self.id
    }
}

pub const LOCATIONS: [Location; 5] = [
    Location {
        id: "NO1",
        name: "Oslo",
        lat: 59.91,
        lon: 10.75,
    },
    Location {
        id: "NO2",
        name: "Kristiansand",
        lat: 58.15,
        lon: 8.00,
    },
    Location {
        id: "NO3",
        name: "Trondheim",
        lat: 63.43,
        lon: 10.39,
    },
    Location {
        id: "NO4",
        name: "Tromsø",
        lat: 69.65,
        lon: 18.96,
    },
    Location {
        id: "NO5",
        name: "Bergen",
        lat: 60.39,
        lon: 5.32,
    },
];

pub fn default_location() -> Location {
    LOCATIONS[0]
}

/// Case-insensitive lookup by id (`no3` == `NO3`).
pub fn find_location(id: &str) -> Option<Location> {
    LOCATIONS
        .iter()
        .find(|l| l.id.eq_ignore_ascii_case(id.trim()))
        .copied()
}

/// Resolve a possibly-missing stored id, falling back to the default.
pub fn resolve_location(id: Option<&str>) -> Location {
    id.and_then(find_location).unwrap_or_else(default_location)
}
