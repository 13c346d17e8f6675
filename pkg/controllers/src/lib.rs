//! Controllers reconciling hub-declared state onto the spoke.

pub mod grant;
pub mod sync;
