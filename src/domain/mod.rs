//! Domain Layer
//!
//! Map viewport model, listing records, and the ports the coordinator
//! depends on. Nothing here performs I/O.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
