//! Bearer credentials and the sources that hand them out.

pub mod client_credentials;
pub mod source;
pub mod token;

pub use client_credentials::*;
pub use source::*;
pub use token::*;
