pub mod configuration;
pub mod delivery;
pub mod domain;
pub mod lead_client;
pub mod local_log;
pub mod retry;
pub mod routes;
pub mod startup;
pub mod submission;
pub mod telemetry;
