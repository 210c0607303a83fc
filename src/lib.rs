pub mod credential;
pub mod dispatch;
pub mod dump;
pub mod export;
pub mod graph;
pub mod grouping;
pub mod identifiers;
pub mod io;
pub mod report;
pub mod stats;
pub mod writer;

