use std::collections::{HashMap, HashSet};

use glam::{DVec2, DVec3};
use rstar::RTree;
use rstar::primitives::GeomWithData;
use tracing::debug;

use crate::spatial::geometry::{self, GeometryError, Triangle};
use crate::spatial::{Readings, Station};

/// Added to squared distances in inverse-distance weighting.
pub const IDW_EPSILON: f64 = 1e-6;

/// Neighbor distances at or below this count as "at the station".
pub const COINCIDENT_DISTANCE: f64 = 1e-12;

/// How readings are estimated between stations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InterpolationStrategy {
    /// Barycentric weights over the nearest non-degenerate triangle.
    /// Extrapolates when the query lies outside that triangle.
    #[default]
    Barycentric,
    /// Inverse-squared-distance average of the `neighbors` nearest stations.
    /// Never leaves the range spanned by those stations.
    Idw { neighbors: usize },
}

/// Errors raised while building or querying a [`Map`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    DuplicateStationLocation { x: f64, y: f64 },
    OutOfBounds { x: f64, y: f64, bounds: String },
    InvalidLocation { x: f64, y: f64 },
    InvalidReading { x: f64, y: f64 },
    Geometry(GeometryError),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::DuplicateStationLocation { x, y } => {
                write!(f, "A station already exists at ({}, {})", x, y)
            }
            MapError::OutOfBounds { x, y, bounds } => write!(
                f,
                "Tried to add station with coordinates ({}, {}), but the map only covers {}",
                x, y, bounds
            ),
            MapError::InvalidLocation { x, y } => {
                write!(f, "Location ({}, {}) is not a finite coordinate pair", x, y)
            }
            MapError::InvalidReading { x, y } => {
                write!(f, "Station at ({}, {}) has non-finite readings", x, y)
            }
            MapError::Geometry(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MapError {}

impl From<GeometryError> for MapError {
    fn from(e: GeometryError) -> Self {
        MapError::Geometry(e)
    }
}

/// Coordinate frame of a map.
#[derive(Debug, Clone, PartialEq)]
enum Frame {
    /// Square grid `[0, size)` on both axes; indexed as-is.
    Grid { size: f64 },
    /// (longitude, latitude) pairs; each axis is min-max rescaled into `[0, 1]`
    /// for the index. `bounds` is `None` until the first station arrives.
    Geo { bounds: Option<(DVec2, DVec2)> },
}

/// Exact-location key. `-0.0` and `0.0` are the same location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LocationKey(u64, u64);

impl LocationKey {
    fn of(location: DVec2) -> Self {
        LocationKey(canonical_bits(location.x), canonical_bits(location.y))
    }
}

fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 { 0.0_f64.to_bits() } else { v.to_bits() }
}

/// Index entry: a station position in index frame, tagged with its station index.
type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// A station returned by a k-nearest query.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Neighbor {
    index: usize,
    distance: f64,
}

/// Sensor stations on a 2-D area, with a nearest-neighbor index for
/// estimating readings anywhere on it.
///
/// The index is rebuilt on every insertion, so it always matches the station set.
#[derive(Debug, Clone)]
pub struct Map {
    frame: Frame,
    strategy: InterpolationStrategy,
    stations: Vec<Station>,
    data: HashMap<LocationKey, usize>,
    /// Station positions in index frame, parallel to `stations`.
    points: Vec<DVec2>,
    index: RTree<IndexedPoint>,
}

impl Map {
    /// A square grid map of side `size`. Every station must lie in `[0, size)`.
    pub fn new(
        stations: Vec<Station>,
        size: f64,
        strategy: InterpolationStrategy,
    ) -> Result<Self, MapError> {
        let mut map = Map {
            frame: Frame::Grid { size },
            strategy,
            stations: Vec::new(),
            data: HashMap::new(),
            points: Vec::new(),
            index: RTree::new(),
        };
        map.add_stations(stations)?;
        Ok(map)
    }

    /// A map over (longitude, latitude) station locations. Bounds are derived
    /// from the stations and widen as stations are added.
    pub fn geo_referenced(
        stations: Vec<Station>,
        strategy: InterpolationStrategy,
    ) -> Result<Self, MapError> {
        let mut map = Map {
            frame: Frame::Geo { bounds: None },
            strategy,
            stations: Vec::new(),
            data: HashMap::new(),
            points: Vec::new(),
            index: RTree::new(),
        };
        map.add_stations(stations)?;
        Ok(map)
    }

    pub fn strategy(&self) -> InterpolationStrategy {
        self.strategy
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn is_geo_referenced(&self) -> bool {
        matches!(self.frame, Frame::Geo { .. })
    }

    pub fn location_is_occupied(&self, location: DVec2) -> bool {
        self.data.contains_key(&LocationKey::of(location))
    }

    /// Lower and upper corners of the area covered by the map.
    /// For geo maps this is the observed station extent.
    pub fn bounds(&self) -> (DVec2, DVec2) {
        match &self.frame {
            Frame::Grid { size } => (DVec2::ZERO, DVec2::splat(*size)),
            Frame::Geo { bounds } => bounds.unwrap_or((DVec2::ZERO, DVec2::ZERO)),
        }
    }

    /// Insert one station and rebuild the index.
    pub fn add_station(&mut self, station: Station) -> Result<(), MapError> {
        self.check_station(&station)?;
        if self.location_is_occupied(station.location) {
            return Err(MapError::DuplicateStationLocation {
                x: station.location.x,
                y: station.location.y,
            });
        }
        self.insert_unindexed(station);
        self.rebuild_index();
        Ok(())
    }

    /// Insert several stations with a single index rebuild.
    ///
    /// All stations are checked before any is inserted; on error the map is unchanged.
    pub fn add_stations(&mut self, stations: Vec<Station>) -> Result<(), MapError> {
        let mut incoming = HashSet::with_capacity(stations.len());
        for station in &stations {
            self.check_station(station)?;
            let key = LocationKey::of(station.location);
            if self.data.contains_key(&key) || !incoming.insert(key) {
                return Err(MapError::DuplicateStationLocation {
                    x: station.location.x,
                    y: station.location.y,
                });
            }
        }

        for station in stations {
            self.insert_unindexed(station);
        }
        self.rebuild_index();
        Ok(())
    }

    fn check_station(&self, station: &Station) -> Result<(), MapError> {
        let (x, y) = (station.location.x, station.location.y);
        if !station.location.is_finite() {
            return Err(MapError::InvalidLocation { x, y });
        }
        if !station.readings.is_finite() {
            return Err(MapError::InvalidReading { x, y });
        }
        match &self.frame {
            Frame::Grid { size } => {
                let inside = |c: f64| (0.0..*size).contains(&c);
                if !inside(x) || !inside(y) {
                    return Err(MapError::OutOfBounds {
                        x,
                        y,
                        bounds: format!("[0, {}) on both axes", size),
                    });
                }
            }
            Frame::Geo { .. } => {
                if !(-180.0..=180.0).contains(&x) || !(-90.0..=90.0).contains(&y) {
                    return Err(MapError::OutOfBounds {
                        x,
                        y,
                        bounds: "longitude [-180, 180] and latitude [-90, 90]".to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn insert_unindexed(&mut self, station: Station) {
        self.data
            .insert(LocationKey::of(station.location), self.stations.len());
        self.stations.push(station);
    }

    fn rebuild_index(&mut self) {
        if let Frame::Geo { bounds } = &mut self.frame {
            let observed = observed_bounds(&self.stations);
            if observed != *bounds {
                debug!(
                    old = ?bounds,
                    new = ?observed,
                    "Geo bounds changed, re-deriving normalization"
                );
                *bounds = observed;
            }
        }

        self.points = self
            .stations
            .iter()
            .map(|s| self.to_index_frame(s.location))
            .collect();
        let entries = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| IndexedPoint::new([p.x, p.y], i))
            .collect();
        self.index = RTree::bulk_load(entries);
        debug!(stations = self.stations.len(), "Spatial index rebuilt");
    }

    /// The `k` stations nearest to `query` (index frame), closest first.
    ///
    /// Equal distances are ordered by station index, including ties at the
    /// k-th place, so results do not depend on tree layout.
    fn nearest(&self, query: DVec2, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }
        let mut found: Vec<(f64, usize)> = Vec::with_capacity(k);
        for entry in self.index.nearest_neighbor_iter(&[query.x, query.y]) {
            let distance_sq = DVec2::from_array(*entry.geom()).distance_squared(query);
            // The iterator yields nondecreasing distances
            if found.len() >= k && found.last().is_some_and(|&(d, _)| d < distance_sq) {
                break;
            }
            found.push((distance_sq, entry.data));
        }
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.truncate(k);
        found
            .into_iter()
            .map(|(distance_sq, index)| Neighbor {
                index,
                distance: distance_sq.sqrt(),
            })
            .collect()
    }

    /// Project a native location into the frame the index is built in.
    fn to_index_frame(&self, location: DVec2) -> DVec2 {
        match &self.frame {
            Frame::Grid { .. } => location,
            Frame::Geo { bounds: None } => location,
            Frame::Geo {
                bounds: Some((min, max)),
            } => {
                let span = *max - *min;
                let rescale = |v: f64, lo: f64, extent: f64| {
                    if extent > 0.0 { (v - lo) / extent } else { 0.0 }
                };
                DVec2::new(
                    rescale(location.x, min.x, span.x),
                    rescale(location.y, min.y, span.y),
                )
            }
        }
    }

    /// Native location of heatmap cell `(i, j)` on a `grid_size × grid_size` grid.
    ///
    /// Grid maps sample integer-aligned points (cell `(i, j)` is location `(i, j)`
    /// when `grid_size` equals the map size); geo maps sample cell centres
    /// across the observed bounds.
    pub fn cell_location(&self, i: usize, j: usize, grid_size: usize) -> DVec2 {
        let grid = grid_size.max(1) as f64;
        match &self.frame {
            Frame::Grid { size } => {
                let scale = size / grid;
                DVec2::new(i as f64 * scale, j as f64 * scale)
            }
            Frame::Geo { .. } => {
                let (min, max) = self.bounds();
                let t = DVec2::new((i as f64 + 0.5) / grid, (j as f64 + 0.5) / grid);
                min + (max - min) * t
            }
        }
    }

    /// Estimate readings at `location` using the configured strategy.
    ///
    /// Returns the station's own readings, unmodified, when a station sits
    /// exactly at `location`. Returns `Ok(None)` when the map holds no stations.
    pub fn interpolate(&self, location: DVec2) -> Result<Option<Readings>, MapError> {
        if !location.is_finite() {
            return Err(MapError::InvalidLocation {
                x: location.x,
                y: location.y,
            });
        }
        if self.stations.is_empty() {
            return Ok(None);
        }
        if let Some(&i) = self.data.get(&LocationKey::of(location)) {
            return Ok(Some(self.stations[i].readings));
        }

        let query = self.to_index_frame(location);
        let readings = match self.strategy {
            InterpolationStrategy::Barycentric => self.barycentric(query)?,
            InterpolationStrategy::Idw { neighbors } => self.inverse_distance(query, neighbors),
        };
        Ok(Some(readings))
    }

    /// Triangulate from the nearest stations, widening the neighbor set until a
    /// non-collinear triple turns up.
    ///
    /// The two nearest stations are always distinct, so a triangle exists iff
    /// some further neighbor is off the line through them.
    fn barycentric(&self, query: DVec2) -> Result<Readings, MapError> {
        let total = self.stations.len();
        let insufficient = GeometryError::InsufficientGeometry { available: total };
        if total < 3 {
            return Err(insufficient.into());
        }

        let mut wanted = 3;
        let mut checked = 2;
        loop {
            let neighbors = self.nearest(query, wanted);
            let a = neighbors[0].index;
            let b = neighbors[1].index;

            for c in neighbors[checked..].iter().map(|n| n.index) {
                let triangle: Triangle = [self.points[a], self.points[b], self.points[c]];
                if !geometry::linearly_independent(&triangle) {
                    continue;
                }
                let weights = geometry::barycentric_coordinates(&triangle, query)?;
                let values = self.stations[a].readings.to_vec3() * weights.x
                    + self.stations[b].readings.to_vec3() * weights.y
                    + self.stations[c].readings.to_vec3() * weights.z;
                return Ok(Readings::from_vec3(values));
            }

            if wanted >= total {
                return Err(insufficient.into());
            }
            checked = neighbors.len();
            wanted = (wanted * 2).min(total);
        }
    }

    fn inverse_distance(&self, query: DVec2, neighbors: usize) -> Readings {
        let nearest = self.nearest(query, neighbors.max(1));
        if let Some(closest) = nearest.first() {
            if closest.distance <= COINCIDENT_DISTANCE {
                return self.stations[closest.index].readings;
            }
        }

        let mut weighted = DVec3::ZERO;
        let mut total_weight = 0.0;
        for n in &nearest {
            let weight = 1.0 / (n.distance * n.distance + IDW_EPSILON);
            weighted += self.stations[n.index].readings.to_vec3() * weight;
            total_weight += weight;
        }
        Readings::from_vec3(weighted / total_weight)
    }
}

fn observed_bounds(stations: &[Station]) -> Option<(DVec2, DVec2)> {
    let mut locations = stations.iter().map(|s| s.location);
    let first = locations.next()?;
    Some(locations.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
}

impl std::fmt::Display for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Map contains the following stations:")?;
        for station in &self.stations {
            write!(f, "\n{}", station)?;
        }
        Ok(())
    }
}
