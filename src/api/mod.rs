pub mod gemini;
pub mod inference;
pub mod trends;
pub mod youtube;
