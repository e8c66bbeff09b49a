//! `msgview`: read Outlook `.msg` and internet-mail `.eml` files without a mail client.
//!
//! Both formats are normalized into one [`model::mail::MailRecord`]: sender,
//! recipients, subject, date, bodies, and attachments. Rendering and export
//! work on that record alone and never see the source format.

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod session;
