pub mod dates;
pub mod lead;
pub mod status;
