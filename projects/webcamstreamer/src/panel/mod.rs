pub mod configuration;
pub mod controller;
pub mod dispatcher;
pub mod registry;
pub mod terminal;
