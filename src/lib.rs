//! # fb2merge
//!
//! A library that merges multiple FictionBook 2 (FB2) documents into a
//! single composite book.
//!
//! Each source document becomes one section of the merged main body.
//! Shared metadata (authors, genres, languages, source URLs) is
//! de-duplicated, identifiers are renamed per source so that footnotes and
//! images stay linked, and footnotes are renumbered across the whole book.
//!
//! ## Examples
//! Merging two documents:
//! ```
//! use fb2merge::{MergeOptions, Merger};
//!
//! const BOOK: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
//! <FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0" xmlns:l="http://www.w3.org/1999/xlink">
//!   <description>
//!     <title-info>
//!       <genre>sf</genre>
//!       <author><first-name>Jane</first-name><last-name>Doe</last-name></author>
//!       <book-title>TITLE</book-title>
//!       <lang>en</lang>
//!     </title-info>
//!   </description>
//!   <body><section><p>Text<a l:href="#n1" type="note">1</a></p></section></body>
//!   <body name="notes"><section id="n1"><title><p>1</p></title><p>Note</p></section></body>
//! </FictionBook>"##;
//!
//! let mut merger = Merger::new("Collected", MergeOptions::default());
//! merger.add_bytes("one.fb2", BOOK.replace("TITLE", "One").as_bytes())?;
//! merger.add_bytes("two.fb2", BOOK.replace("TITLE", "Two").as_bytes())?;
//!
//! let (book, outcome) = merger.finish();
//! let xml = String::from_utf8(book.to_vec()?).unwrap();
//!
//! assert!(outcome.is_valid(), "{:?}", outcome.issues());
//! assert!(xml.contains(r#"<body name="notes">"#));
//! assert!(xml.contains(">[2]</a>"));
//! # Ok::<(), fb2merge::errors::MergeError>(())
//! ```
//! Driving the individual steps:
//! ```
//! use fb2merge::book::BookCreator;
//! use fb2merge::section::{FrontMatter, Section};
//! use fb2merge::stats::BookStats;
//! use fb2merge::Fb2Source;
//!
//! # fn main() -> fb2merge::errors::MergeResult<()> {
//! # let bytes = br#"<FictionBook><description><title-info><book-title>One</book-title></title-info></description><body><p>x</p></body></FictionBook>"#;
//! let mut creator = BookCreator::new("Collected");
//! let mut stats = BookStats::new();
//!
//! let mut source = Fb2Source::read("one.fb2", bytes)?;
//! let bodies = source.check_structure()?;
//! let info = stats.process(&mut source, 0)?;
//! let front = FrontMatter::from_source(&source);
//! let section = Section::parse(source.document(), bodies.main)?
//!     .rebuild_section(source.document_mut(), &front)?;
//!
//! creator.insert_book(info.key().clone(), source.document(), section, &[]);
//!
//! let book = creator.finish(&stats);
//! assert_eq!("FictionBook", book.document().tag(book.document().root()));
//! # Ok(())
//! # }
//! ```

mod archive;
mod merge;
mod writer;

pub mod book;
pub mod datetime;
pub mod dom;
pub mod errors;
pub mod fb2;
pub mod parser;
pub mod rebind;
pub mod section;
pub mod stats;
pub mod validate;

pub use self::{
    book::{BookCreator, MergedBook},
    fb2::Fb2Source,
    merge::{MergeOptions, Merger},
    validate::{StructuralValidator, ValidationOutcome, Validator},
};
