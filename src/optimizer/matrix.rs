//! Matriz de distancias y tiempos de viaje

use crate::utils::geo::{haversine_km, GeoPoint};

/// Distancias (km) y tiempos (min) entre todos los puntos del problema.
#[derive(Debug, Clone)]
pub struct TravelMatrix {
    size: usize,
    distances: Vec<f64>,
    minutes_per_km: f64,
}

impl TravelMatrix {
    pub fn new(points: &[GeoPoint], average_speed_kmh: f64) -> Self {
        let size = points.len();
        let distances = points
            .iter()
            .flat_map(|p1| points.iter().map(move |p2| haversine_km(p1, p2)))
            .collect();

        let speed = if average_speed_kmh > 0.0 { average_speed_kmh } else { 1.0 };

        Self {
            size,
            distances,
            minutes_per_km: 60.0 / speed,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.size + to]
    }

    #[inline]
    pub fn minutes(&self, from: usize, to: usize) -> f64 {
        self.distance(from, to) * self.minutes_per_km
    }
}
