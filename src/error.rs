use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid street graph: {0}")]
    InvalidGraph(String),
    #[error(
        "Ring search exceeded its state cap of {cap} ({visited} states visited); \
         reduce the search radius or max_cycle_elements"
    )]
    RingSearchOverflow { cap: usize, visited: usize },
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
