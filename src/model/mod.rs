//! Core data model types: the normalized record, identities, and attachments.

pub mod address;
pub mod attachment;
pub mod mail;
