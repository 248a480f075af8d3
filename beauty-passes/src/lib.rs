//! Static passes run over the syntax tree before execution.

pub mod typeck;
