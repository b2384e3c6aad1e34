//! Aeroelastic flutter screening of thin rectangular panels
//!
//! Three methods of increasing cost are available: a closed-form piston theory estimate, a
//! doublet-lattice K-method sweep and an external high-fidelity solver. [selector] picks one
//! for a flight condition, [framework] runs several and [postprocessing] reconciles them.
#![allow(clippy::needless_range_loop)] // Makes math code less readable
#![warn(missing_docs)]

pub mod bracket;
pub mod control;
pub mod dynamic_interface;
pub mod framework;
mod helpers;
pub mod linalg;
pub mod model;
pub mod postprocessing;
pub mod selector;
pub mod solver;
pub mod study;
pub mod system;
