//! Terminal rendering of store and session state

pub mod markup;
pub mod outline;

pub use markup::{
    check_math_delimiters, parse_markup, render_isolated, render_markup, render_overlay, Block,
    Document, Inline, RenderedExplanation, RENDER_FALLBACK,
};
pub use outline::{render_outline, render_state, Outline, EMPTY_MESSAGE, GENERATING_MESSAGE};
