//! Command handlers.
//!
//! | File     | Invocation                       | Description                   |
//! |----------|----------------------------------|-------------------------------|
//! | `run.rs` | `db-backup [-b] [-r DAYS] ...`   | Dump and/or retention sweep   |

pub mod run;
