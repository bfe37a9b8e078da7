pub mod kickpoints;
