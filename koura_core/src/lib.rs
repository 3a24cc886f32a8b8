//! `koura_core` is the rendering engine behind [koura](https://github.com/ifiokjr/koura).
//! It takes a template made of literal text, output tags (`{{ expr }}`) and
//! control tags (`{% tag ... %}`), renders it against a [`Context`] of named
//! values and produces text.
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template text
//!   → Scanner (copies literal text, finds the next `{{` / `{%`, probes tag names)
//!   → Dispatcher (output tag, built-in control tag, or registered custom tag)
//!   → Expression parser (literals, list literals, `name` / `name.field` references)
//!   → Filter pipeline (`| name` transforms applied left to right)
//!   → Output
//! ```
//!
//! Loops and conditionals re-drive the same loop over a region of the
//! template: a `for` body is rendered once per element by rewinding the
//! scanner to the start of the body, each time against a child context.
//!
//! ## Modules
//!
//! - [`config`]: `koura.toml` loading and data files (JSON, TOML, YAML, text)
//!   that populate a context.
//! - [`expression`]: the expression grammar used inside tags.
//!
//! ## Key Types
//!
//! - [`Engine`]: renders templates and holds custom tags and filters.
//! - [`Context`]: the names visible while rendering, layered per loop body.
//! - [`Entity`]: a value: text, number, object or sequence.
//! - [`Scanner`]: the rewindable cursor handed to custom tag handlers.
//! - [`KouraError`]: every failure, with the template location it happened
//!   at.
//!
//! ## Quick Start
//!
//! ```rust
//! use koura_core::Context;
//! use koura_core::Engine;
//!
//! let mut engine = Engine::new();
//! engine
//! 	.register_custom_filter("exclaim", |text, _| format!("{text}!"))
//! 	.unwrap();
//!
//! let mut context = Context::new()
//! 	.with_entity("what", "world")
//! 	.with_entity("items", vec!["a", "b"]);
//!
//! let output = engine
//! 	.render(
//! 		"Hello {{ what | capitalize | exclaim }}\n{% for x in items %}{{ x }};{% endfor %}",
//! 		&mut context,
//! 	)
//! 	.unwrap();
//!
//! assert_eq!(output, "Hello World!\na;b;");
//! ```
//!
//! ## Failures
//!
//! Every problem aborts the render with a [`KouraError`]. Output is buffered,
//! so a failed render never hands back partial text.

pub use context::*;
pub use engine::*;
pub use entity::*;
pub use error::*;
pub use filters::*;
pub use position::*;
pub use scanner::*;
pub use tags::TagHandler;
pub use tags::TagKind;

pub mod config;
mod context;
mod engine;
mod entity;
#[allow(unused_assignments)]
mod error;
pub mod expression;
mod filters;
mod position;
mod scanner;
mod tags;

#[cfg(test)]
mod __fixtures;
