pub mod attendance;
pub mod department;
pub mod employee;
pub mod guard;
pub mod stats;
