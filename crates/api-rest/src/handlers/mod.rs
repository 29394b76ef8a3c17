//! REST endpoint handlers, grouped per resource.

pub mod access;
pub mod caregivers;
pub mod health;
pub mod institutions;
pub mod patients;
pub mod registration;
pub mod relationship_types;
pub mod relationships;
pub mod sites;
