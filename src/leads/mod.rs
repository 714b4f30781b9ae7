pub mod mutations;

pub use mutations::{LeadService, LeadServiceConfig};
