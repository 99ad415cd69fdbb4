//! # maygasse-apply
//!
//! Web server of the Maygasse Finance Society site: serves the static pages
//! and turns the membership application form (with the applicant's CV
//! attached) into an email, sent either through an SMTP server or the local
//! `sendmail`.

pub mod config;
pub mod form;
pub mod mail;
pub mod smtp;
pub mod time;
pub mod tracing;
pub mod vars;
pub mod web;
