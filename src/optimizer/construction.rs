//! Construcción inicial: inserción más barata en paralelo
//!
//! En cada iteración se evalúan todos los pedidos pendientes contra todos
//! los tours abiertos (en todas las posiciones) y contra la apertura del
//! siguiente vehículo libre, y se aplica la inserción factible de menor
//! costo. Los empates se resuelven por orden de pedido y luego de tour.

use std::collections::HashMap;

use super::matrix::TravelMatrix;
use super::{simulate, Problem, UnassignedJob, UnassignedReason, EPSILON};

/// Tour en construcción: índice de vehículo y secuencia de jobs
#[derive(Debug, Clone, PartialEq)]
pub struct TourPlan {
    pub vehicle: usize,
    pub sequence: Vec<usize>,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Construction {
    pub tours: Vec<TourPlan>,
    pub unassigned: Vec<UnassignedJob>,
}

#[derive(Debug, Clone, Copy)]
struct Insertion {
    position: usize,
    cost: f64,
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Existing(usize),
    NewVehicle,
}

#[derive(Debug, Clone, Copy)]
struct Choice {
    job: usize,
    target: Target,
    position: usize,
    cost: f64,
}

pub fn cheapest_insertion(problem: &Problem, matrix: &TravelMatrix) -> Construction {
    let max_capacity = problem.max_capacity();
    let mut result = Construction::default();
    let mut pending = Vec::new();

    for (index, job) in problem.jobs.iter().enumerate() {
        if job.demand > max_capacity {
            result.unassigned.push(UnassignedJob {
                job: index,
                reason: UnassignedReason::Capacity,
            });
        } else if simulate(problem, matrix, &[index]).is_none() {
            result.unassigned.push(UnassignedJob {
                job: index,
                reason: UnassignedReason::TimeWindow,
            });
        } else {
            pending.push(index);
        }
    }

    let mut next_vehicle = 0;
    let mut cache: HashMap<(usize, usize), Option<Insertion>> = HashMap::new();
    let mut dirty: Option<usize> = None;

    while !pending.is_empty() {
        let mut best: Option<Choice> = None;
        let mut consider = |choice: Choice| {
            if best.map_or(true, |b| choice.cost < b.cost - EPSILON) {
                best = Some(choice);
            }
        };

        for &job in &pending {
            for (tour_index, tour) in result.tours.iter().enumerate() {
                let key = (job, tour_index);
                if dirty == Some(tour_index) || !cache.contains_key(&key) {
                    cache.insert(key, best_insertion(problem, matrix, tour, job));
                }
                if let Some(Some(insertion)) = cache.get(&key) {
                    consider(Choice {
                        job,
                        target: Target::Existing(tour_index),
                        position: insertion.position,
                        cost: insertion.cost,
                    });
                }
            }

            if let Some(vehicle) = problem.vehicles.get(next_vehicle) {
                if problem.jobs[job].demand <= vehicle.capacity {
                    if let Some(schedule) = simulate(problem, matrix, &[job]) {
                        consider(Choice {
                            job,
                            target: Target::NewVehicle,
                            position: 0,
                            cost: schedule.distance_km + problem.settings.vehicle_cost_km,
                        });
                    }
                }
            }
        }

        let Some(choice) = best else {
            break;
        };

        match choice.target {
            Target::Existing(tour_index) => {
                let tour = &mut result.tours[tour_index];
                tour.sequence.insert(choice.position, choice.job);
                tour.distance_km = simulate(problem, matrix, &tour.sequence)
                    .map(|s| s.distance_km)
                    .unwrap_or(tour.distance_km + choice.cost);
                dirty = Some(tour_index);
            }
            Target::NewVehicle => {
                result.tours.push(TourPlan {
                    vehicle: next_vehicle,
                    sequence: vec![choice.job],
                    distance_km: choice.cost - problem.settings.vehicle_cost_km,
                });
                next_vehicle += 1;
                dirty = None;
            }
        }

        pending.retain(|&j| j != choice.job);
    }

    result.unassigned.extend(pending.into_iter().map(|job| UnassignedJob {
        job,
        reason: UnassignedReason::NoCapacityLeft,
    }));
    result.unassigned.sort_by_key(|u| u.job);

    result
}

/// Mejor posición factible para `job` dentro de `tour`
fn best_insertion(problem: &Problem, matrix: &TravelMatrix, tour: &TourPlan, job: usize) -> Option<Insertion> {
    let capacity = problem.vehicles[tour.vehicle].capacity;
    if problem.load_of(&tour.sequence) + problem.jobs[job].demand > capacity {
        return None;
    }

    let mut best: Option<Insertion> = None;
    for position in 0..=tour.sequence.len() {
        let mut candidate = tour.sequence.clone();
        candidate.insert(position, job);

        if let Some(schedule) = simulate(problem, matrix, &candidate) {
            let cost = schedule.distance_km - tour.distance_km;
            if best.map_or(true, |b| cost < b.cost - EPSILON) {
                best = Some(Insertion { position, cost });
            }
        }
    }

    best
}
