pub mod argentinadatos;
pub mod quote_source;
