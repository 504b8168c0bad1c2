/*!
# pkmeter DevKit - test support for pkmeter

Helpers for exercising pkmeter end to end without touching the real
configuration or cache directories:
- Temporary root and cache directories
- Cache documents with controllable ages
- Stub widgets with fixed heights and scripted updates
- Builders for user configuration layers
*/

pub mod config_builder;
pub mod stub_widget;
pub mod test_utils;

pub use config_builder::ConfigBuilder;
pub use stub_widget::{stub_registry, StubWidget, STUB_KIND};
pub use test_utils::TestHarness;
