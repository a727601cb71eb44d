pub mod controller;
pub mod dto;
pub mod ports;
pub mod services;
