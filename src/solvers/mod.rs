mod branch;
mod form;
mod tableau;

pub mod dense;
pub mod incremental;
