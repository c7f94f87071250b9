//! Solver de rutas

use super::construction::{cheapest_insertion, TourPlan};
use super::local_search::improve;
use super::matrix::TravelMatrix;
use super::{simulate, PlannedStop, Problem, Solution, Tour, UnassignedJob, UnassignedReason};

/// Estrategia de resolución del problema de ruteo
pub trait RouteSolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &Problem) -> Solution;
}

/// Inserción más barata + búsqueda local
#[derive(Debug, Clone, Copy, Default)]
pub struct InsertionSolver;

impl RouteSolver for InsertionSolver {
    fn name(&self) -> &'static str {
        "cheapest-insertion+local-search"
    }

    fn solve(&self, problem: &Problem) -> Solution {
        if problem.jobs.is_empty() {
            return Solution::default();
        }

        let matrix = TravelMatrix::new(&problem.points(), problem.settings.average_speed_kmh);

        let construction = cheapest_insertion(problem, &matrix);
        let mut plans = construction.tours;
        let mut unassigned = construction.unassigned;

        improve(problem, &matrix, &mut plans);
        plans.sort_by_key(|p| p.vehicle);

        let mut tours = Vec::with_capacity(plans.len());
        for plan in plans {
            match to_tour(problem, &matrix, &plan) {
                Some(tour) => tours.push(tour),
                None => unassigned.extend(plan.sequence.iter().map(|&job| UnassignedJob {
                    job,
                    reason: UnassignedReason::NoCapacityLeft,
                })),
            }
        }
        unassigned.sort_by_key(|u| u.job);

        Solution { tours, unassigned }
    }
}

fn to_tour(problem: &Problem, matrix: &TravelMatrix, plan: &TourPlan) -> Option<Tour> {
    let schedule = simulate(problem, matrix, &plan.sequence)?;

    let stops = plan
        .sequence
        .iter()
        .zip(schedule.arrivals.iter().zip(schedule.legs.iter()))
        .map(|(&job, (&arrival, &leg))| PlannedStop {
            job,
            arrival_minutes: arrival,
            distance_from_previous_km: leg,
        })
        .collect();

    Some(Tour {
        vehicle: plan.vehicle,
        stops,
        distance_km: schedule.distance_km,
        duration_minutes: schedule.duration_minutes,
        load: problem.load_of(&plan.sequence),
    })
}
