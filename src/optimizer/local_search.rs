//! Búsqueda local sobre el plan construido
//!
//! 2-opt dentro de cada tour y relocate entre tours. Solo se aceptan
//! movimientos factibles que mejoran estrictamente la distancia.

use super::construction::TourPlan;
use super::matrix::TravelMatrix;
use super::{simulate, Problem, EPSILON};

pub fn improve(problem: &Problem, matrix: &TravelMatrix, tours: &mut Vec<TourPlan>) {
    for _ in 0..problem.settings.local_search_rounds {
        let mut improved = false;

        for tour in tours.iter_mut() {
            while two_opt(problem, matrix, tour) {
                improved = true;
            }
        }

        if relocate(problem, matrix, tours) {
            improved = true;
        }

        if !improved {
            break;
        }
    }

    tours.retain(|t| !t.sequence.is_empty());
}

/// Primer movimiento 2-opt que mejora el tour
pub fn two_opt(problem: &Problem, matrix: &TravelMatrix, tour: &mut TourPlan) -> bool {
    let n = tour.sequence.len();
    if n < 2 {
        return false;
    }

    for i in 0..n - 1 {
        for k in i + 1..n {
            let mut candidate = tour.sequence.clone();
            candidate[i..=k].reverse();

            if let Some(schedule) = simulate(problem, matrix, &candidate) {
                if schedule.distance_km < tour.distance_km - EPSILON {
                    tour.sequence = candidate;
                    tour.distance_km = schedule.distance_km;
                    return true;
                }
            }
        }
    }

    false
}

/// Primer movimiento de un job hacia otro tour que reduce la distancia total
pub fn relocate(problem: &Problem, matrix: &TravelMatrix, tours: &mut [TourPlan]) -> bool {
    for from in 0..tours.len() {
        for i in 0..tours[from].sequence.len() {
            let job = tours[from].sequence[i];
            let demand = problem.jobs[job].demand;

            let mut reduced = tours[from].sequence.clone();
            reduced.remove(i);

            let (reduced_distance, closes_vehicle) = if reduced.is_empty() {
                (0.0, true)
            } else {
                match simulate(problem, matrix, &reduced) {
                    Some(schedule) => (schedule.distance_km, false),
                    None => continue,
                }
            };

            let mut gain = tours[from].distance_km - reduced_distance;
            if closes_vehicle {
                gain += problem.settings.vehicle_cost_km;
            }

            for to in 0..tours.len() {
                if to == from || tours[to].sequence.is_empty() {
                    continue;
                }

                let capacity = problem.vehicles[tours[to].vehicle].capacity;
                if problem.load_of(&tours[to].sequence) + demand > capacity {
                    continue;
                }

                for position in 0..=tours[to].sequence.len() {
                    let mut candidate = tours[to].sequence.clone();
                    candidate.insert(position, job);

                    if let Some(schedule) = simulate(problem, matrix, &candidate) {
                        let added = schedule.distance_km - tours[to].distance_km;
                        if added < gain - EPSILON {
                            tours[from].sequence = reduced;
                            tours[from].distance_km = reduced_distance;
                            tours[to].sequence = candidate;
                            tours[to].distance_km = schedule.distance_km;
                            return true;
                        }
                    }
                }
            }
        }
    }

    false
}
