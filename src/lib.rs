//! A CSS3 parser and object model: decode text or bytes, build a recoverable
//! concrete syntax tree, interpret it into a `CascadingStyleSheet`, walk or
//! rewrite that tree with a visitor, and serialize it back to text.
//!
//! # Basic usage
//!
//! ```
//! let options = cssom::reader::ReaderOptions::default();
//! let sheet = cssom::reader::parse_text(".box { color: red; }", &options)
//!     .expect("this input has nothing a strict-mode parse would reject");
//! assert_eq!(sheet.rules.len(), 1);
//!
//! let text = cssom::writer::serialize(&sheet, &cssom::writer::WriterSettings::default());
//! assert!(text.contains("color"));
//! ```
//!
//! # Strict vs. browser-compliant parsing
//!
//! By default the parser is strict: a malformed construct it cannot repair
//! raises a fatal exception and the whole parse reports `None`, after
//! notifying whatever [`error::ParseExceptionHandler`] was configured.
//! Setting [`reader::ReaderOptions::browser_compliant_mode`] switches to the
//! recovery ladder real browsers use — skip to the next recovery point
//! (the next `;` or matching `}`) and keep going — so a call in that mode
//! always returns `Some`, possibly with fewer rules than the input named.
//!
//! # Error handling
//!
//! Three handler traits separate the "what happened" from "what to do about
//! it": [`error::ParseErrorHandler`] for recoverable lexer/parser problems,
//! [`error::ParseExceptionHandler`] for the strict-mode fatal case, and
//! [`error::InterpretErrorHandler`] for shape problems the CST-to-CSSOM
//! interpreter finds (duplicate `@charset`, an unknown media modifier, and
//! so on). [`error::NullErrorHandler`] discards everything;
//! [`error::CollectingErrorHandler`] records everything behind a mutex, for
//! callers who want to inspect every diagnostic after a parse completes.
//!
//! # Encoding
//!
//! [`reader::parse_bytes`] resolves an unknown encoding via a byte-order
//! mark, then a literal `@charset "name";` at byte offset 0, then the
//! caller's fallback (ISO-8859-1 by default) — see [`reader::ReaderOptions`].
//! Already-decoded text goes straight to [`reader::parse_text`].

#![warn(nonstandard_style, rust_2018_idioms, unused)]
#![warn(renamed_and_removed_lints)]
#![warn(trivial_casts, trivial_numeric_casts)]

pub mod log;

mod util;

pub mod cssom;
pub mod cst;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod reader;
pub mod stream;
pub mod token;
pub mod visitor;
pub mod writer;

pub use crate::cssom::CascadingStyleSheet;
pub use crate::error::{InterpretErrorHandler, ParseErrorHandler, ParseExceptionHandler};
pub use crate::reader::{parse_bytes, parse_text, CssVersion, ReaderOptions};
pub use crate::writer::{serialize, WriterSettings};
