pub mod config;
pub mod db;
pub mod domain;
pub mod pipeline;
pub mod repos;
pub mod routes;
pub mod services;
