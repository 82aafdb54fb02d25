pub mod app;
mod deserializers;
pub mod errors;
mod routes;
