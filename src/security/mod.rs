pub mod inspector;
pub mod patterns;

pub use inspector::{InspectorLayer, SecurityInspector};
