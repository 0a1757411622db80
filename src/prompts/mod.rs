//! Instruction templates and the renderer that binds inputs into them.

mod renderer;
pub mod templates;

pub use renderer::PromptRenderer;
