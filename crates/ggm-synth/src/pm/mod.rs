//! Physical-modelling excitation sources.

pub mod breath;
