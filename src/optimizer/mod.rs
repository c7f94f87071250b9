//! Optimizador de rutas
//!
//! Resuelve un problema de ruteo de vehículos con capacidad y ventanas
//! horarias (CVRPTW): inserción más barata en paralelo seguida de búsqueda
//! local (2-opt y relocate). Es determinista: la misma entrada produce
//! siempre el mismo plan.
//!
//! Todos los tiempos se expresan en minutos desde el inicio del turno.

pub mod construction;
pub mod local_search;
pub mod matrix;
pub mod solver;

use serde::{Deserialize, Serialize};

use crate::utils::geo::GeoPoint;
use matrix::TravelMatrix;

pub use solver::{InsertionSolver, RouteSolver};

const EPSILON: f64 = 1e-6;

/// Parámetros del optimizador
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerSettings {
    pub average_speed_kmh: f64,
    pub default_service_minutes: u32,
    pub max_shift_minutes: f64,
    /// Costo fijo, en km equivalentes, de abrir un vehículo adicional
    pub vehicle_cost_km: f64,
    pub local_search_rounds: usize,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            average_speed_kmh: 40.0,
            default_service_minutes: 10,
            max_shift_minutes: 600.0,
            vehicle_cost_km: 5.0,
            local_search_rounds: 50,
        }
    }
}

/// Ventana horaria en minutos desde el inicio del turno
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

/// Un pedido a entregar
#[derive(Debug, Clone)]
pub struct Job {
    pub order_id: String,
    pub customer_id: String,
    pub point: GeoPoint,
    pub demand: i32,
    pub service_minutes: f64,
    pub window: Option<TimeWindow>,
}

/// Vehículo disponible para el plan
#[derive(Debug, Clone)]
pub struct VehicleSpec {
    pub vehicle_id: String,
    pub driver_id: Option<String>,
    pub capacity: i32,
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub depot: GeoPoint,
    pub jobs: Vec<Job>,
    pub vehicles: Vec<VehicleSpec>,
    pub settings: OptimizerSettings,
}

impl Problem {
    /// Puntos de la matriz: el depósito en el índice 0, el job `i` en `i + 1`.
    pub fn points(&self) -> Vec<GeoPoint> {
        std::iter::once(self.depot)
            .chain(self.jobs.iter().map(|j| j.point))
            .collect()
    }

    pub fn max_capacity(&self) -> i32 {
        self.vehicles.iter().map(|v| v.capacity).max().unwrap_or(0)
    }

    pub(crate) fn load_of(&self, sequence: &[usize]) -> i32 {
        sequence.iter().map(|&j| self.jobs[j].demand).sum()
    }
}

/// Parada planificada dentro de un tour
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStop {
    pub job: usize,
    /// Inicio del servicio (después de esperar la apertura de la ventana)
    pub arrival_minutes: f64,
    pub distance_from_previous_km: f64,
}

/// Tour asignado a un vehículo
#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub vehicle: usize,
    pub stops: Vec<PlannedStop>,
    pub distance_km: f64,
    /// Desde la salida hasta el regreso al depósito
    pub duration_minutes: f64,
    pub load: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// La demanda supera la capacidad de todos los vehículos
    Capacity,
    /// No se alcanza la ventana horaria ni yendo directo desde el depósito
    TimeWindow,
    /// No queda vehículo con capacidad o tiempo para el pedido
    NoCapacityLeft,
}

impl UnassignedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnassignedReason::Capacity => "capacity",
            UnassignedReason::TimeWindow => "time_window",
            UnassignedReason::NoCapacityLeft => "no_capacity_left",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnassignedJob {
    pub job: usize,
    pub reason: UnassignedReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    pub tours: Vec<Tour>,
    pub unassigned: Vec<UnassignedJob>,
}

impl Solution {
    pub fn assigned_jobs(&self) -> usize {
        self.tours.iter().map(|t| t.stops.len()).sum()
    }

    pub fn total_distance_km(&self) -> f64 {
        self.tours.iter().map(|t| t.distance_km).sum()
    }
}

/// Resultado de simular una secuencia de jobs
#[derive(Debug, Clone)]
pub(crate) struct Schedule {
    pub arrivals: Vec<f64>,
    pub legs: Vec<f64>,
    pub distance_km: f64,
    pub duration_minutes: f64,
}

/// Simula la secuencia desde y hacia el depósito. Devuelve `None` si viola
/// alguna ventana horaria o el largo máximo del turno.
pub(crate) fn simulate(problem: &Problem, matrix: &TravelMatrix, sequence: &[usize]) -> Option<Schedule> {
    let mut time = 0.0;
    let mut distance = 0.0;
    let mut previous = 0;
    let mut arrivals = Vec::with_capacity(sequence.len());
    let mut legs = Vec::with_capacity(sequence.len());

    for &job_index in sequence {
        let job = &problem.jobs[job_index];
        let node = job_index + 1;

        let leg = matrix.distance(previous, node);
        time += matrix.minutes(previous, node);

        if let Some(window) = job.window {
            if time > window.end + EPSILON {
                return None;
            }
            if time < window.start {
                time = window.start;
            }
        }

        arrivals.push(time);
        legs.push(leg);
        distance += leg;
        time += job.service_minutes;
        previous = node;
    }

    distance += matrix.distance(previous, 0);
    time += matrix.minutes(previous, 0);

    if time > problem.settings.max_shift_minutes + EPSILON {
        return None;
    }

    Some(Schedule {
        arrivals,
        legs,
        distance_km: distance,
        duration_minutes: time,
    })
}
