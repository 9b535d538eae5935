use std::collections::HashSet;

use glam::DVec2;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::config::simulation::GenerationConfig;
use crate::spatial::{Readings, Station};

/// A randomly generated station set and the seed that reproduces it.
#[derive(Debug, Clone)]
pub struct GeneratedStations {
    pub seed: u64,
    pub stations: Vec<Station>,
}

/// Place `params.station_count` stations at unique integer locations on a
/// `map_size × map_size` grid, with readings drawn uniformly from
/// `[0, max)` for each quantity.
///
/// If `params.seed` is 0, a random seed is chosen and reported back.
pub fn generate_random_stations(
    params: &GenerationConfig,
    map_size: u32,
) -> Result<GeneratedStations, String> {
    if params.max_air_pollution == 0
        || params.max_population_density == 0
        || params.max_vegetation_cover == 0
    {
        return Err("Reading maxima must all be > 0".to_string());
    }

    let seed = if params.seed == 0 {
        rand::thread_rng().r#gen()
    } else {
        params.seed
    };
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let locations = generate_unique_locations(&mut rng, params.station_count, map_size)?;
    let stations = locations
        .into_iter()
        .map(|(x, y)| {
            let readings = Readings::new(
                rng.gen_range(0..params.max_air_pollution) as f64,
                rng.gen_range(0..params.max_population_density) as f64,
                rng.gen_range(0..params.max_vegetation_cover) as f64,
            );
            Station::new(DVec2::new(x as f64, y as f64), readings)
        })
        .collect();

    Ok(GeneratedStations { seed, stations })
}

/// Draw `count` distinct `(x, y)` cells with `x, y < map_size`, in draw order.
pub fn generate_unique_locations(
    rng: &mut impl Rng,
    count: u32,
    map_size: u32,
) -> Result<Vec<(u32, u32)>, String> {
    let capacity = map_size as u64 * map_size as u64;
    if count as u64 > capacity {
        return Err(format!(
            "The map is too small to have this many unique locations (count={}, map_size={})",
            count, map_size
        ));
    }

    let mut seen = HashSet::with_capacity(count as usize);
    let mut locations = Vec::with_capacity(count as usize);
    while locations.len() < count as usize {
        let cell = (rng.gen_range(0..map_size), rng.gen_range(0..map_size));
        if seen.insert(cell) {
            locations.push(cell);
        }
    }
    Ok(locations)
}
