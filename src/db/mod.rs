pub mod redshift;
pub mod warehouse;
