//! Traits for generator system standardization.

use super::merge::Bindings;
use super::package::Package;
use super::EngineError;

/// Trait for turning an opened template and one binding set into a document.
pub trait Render {
    /// Render a new package. The template must not be modified.
    fn render(&self, package: &Package<'_>, bindings: &Bindings) -> Result<Vec<u8>, EngineError>;
}
