//! Core gateway machinery.

pub mod gateway;
