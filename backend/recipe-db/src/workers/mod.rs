//! Background jobs that run beside the host service

pub mod meal_plan_finalizer;
