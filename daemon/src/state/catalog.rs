//! Station catalog with cyclic navigation

use crate::config::Station;

/// Ordered list of stations and the currently selected index
///
/// The index always points at a valid station while the catalog is
/// non-empty. Navigation on an empty catalog does nothing.
#[derive(Debug, Clone, Default)]
pub struct StationCatalog {
    stations: Vec<Station>,
    index: usize,
}

impl StationCatalog {
    pub fn new(stations: Vec<Station>) -> Self {
        Self { stations, index: 0 }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Index of the selected station
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }

    /// The selected station, if the catalog is non-empty
    pub fn current(&self) -> Option<&Station> {
        self.stations.get(self.index)
    }

    /// Move to the next station, wrapping to the first. Returns false on an empty catalog.
    pub fn next(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.index = (self.index + 1) % self.len();
        true
    }

    /// Move to the previous station, wrapping to the last. Returns false on an empty catalog.
    pub fn prev(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        self.index = (self.index + self.len() - 1) % self.len();
        true
    }

    /// Playback volume of the selected station for the given master volume
    pub fn current_volume(&self, max_volume: i32) -> u8 {
        self.current()
            .map(|station| scaled_volume(max_volume, station.volume_percent))
            .unwrap_or(0)
    }
}

/// `max_volume` scaled by `percent`, rounded and clamped to 0-100
pub fn scaled_volume(max_volume: i32, percent: i32) -> u8 {
    let scaled = (f64::from(max_volume) * f64::from(percent) / 100.0).round();
    scaled.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(count: usize) -> StationCatalog {
        StationCatalog::new(
            (0..count)
                .map(|i| Station {
                    url: format!("http://radio.example/{i}"),
                    name: format!("Station {i}"),
                    volume_percent: 100,
                })
                .collect(),
        )
    }

    #[test]
    fn test_next_wraps_to_first() {
        let mut catalog = catalog(3);
        assert!(catalog.next());
        assert!(catalog.next());
        assert_eq!(catalog.index(), 2);
        assert!(catalog.next());
        assert_eq!(catalog.index(), 0);
    }

    #[test]
    fn test_prev_wraps_to_last() {
        let mut catalog = catalog(4);
        assert!(catalog.prev());
        assert_eq!(catalog.index(), 3);
        assert!(catalog.prev());
        assert_eq!(catalog.index(), 2);
    }

    #[test]
    fn test_single_station_stays_put() {
        let mut catalog = catalog(1);
        assert!(catalog.next());
        assert_eq!(catalog.index(), 0);
        assert!(catalog.prev());
        assert_eq!(catalog.index(), 0);
    }

    #[test]
    fn test_empty_catalog_navigation_is_noop() {
        let mut catalog = StationCatalog::default();
        assert!(!catalog.next());
        assert!(!catalog.prev());
        assert_eq!(catalog.index(), 0);
        assert!(catalog.current().is_none());
        assert_eq!(catalog.current_volume(90), 0);
    }

    #[test]
    fn test_scaled_volume() {
        assert_eq!(scaled_volume(90, 50), 45);
        assert_eq!(scaled_volume(90, 0), 0);
        assert_eq!(scaled_volume(100, 150), 100);
        assert_eq!(scaled_volume(90, 100), 90);
        assert_eq!(scaled_volume(90, -20), 0);
        assert_eq!(scaled_volume(75, 33), 25);
        assert_eq!(scaled_volume(150, 50), 75);
        assert_eq!(scaled_volume(150, 100), 100);
    }

    #[test]
    fn test_current_volume_uses_selected_station() {
        let mut catalog = StationCatalog::new(vec![
            Station {
                url: "a".into(),
                name: "A".into(),
                volume_percent: 100,
            },
            Station {
                url: "b".into(),
                name: "B".into(),
                volume_percent: 50,
            },
        ]);
        assert_eq!(catalog.current_volume(90), 90);
        catalog.next();
        assert_eq!(catalog.current_volume(90), 45);
    }
}
