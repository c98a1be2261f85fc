use thiserror::Error;

pub type GridResult<T> = Result<T, GridError>;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("invalid table contents: rows={rows}, cols={cols}")]
    InvalidContents { rows: usize, cols: usize },

    #[error("cell ({row}, {col}) is outside of a {rows}x{cols} table")]
    CellOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("invalid size value: {0}")]
    InvalidSize(String),

    #[error("unknown tree node: {0}")]
    UnknownNode(u32),

    #[error("invalid data: {0}")]
    InvalidData(String),
}
