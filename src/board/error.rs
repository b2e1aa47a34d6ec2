//! Error types for chess board operations.

use thiserror::Error;

/// Error type for FEN parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has too few parts (needs at least 4)
    #[error("FEN must have at least 4 parts, found {found}")]
    TooFewParts { found: usize },
    /// Invalid piece character in position string
    #[error("Invalid piece character '{char}' in FEN")]
    InvalidPiece { char: char },
    /// Invalid castling character
    #[error("Invalid castling character '{char}' in FEN")]
    InvalidCastling { char: char },
    /// Invalid side to move (must be 'w' or 'b')
    #[error("Invalid side to move '{found}', expected 'w' or 'b'")]
    InvalidSideToMove { found: String },
    /// Invalid en passant square
    #[error("Invalid en passant square '{found}'")]
    InvalidEnPassant { found: String },
    /// Invalid rank in position string
    #[error("Invalid rank index {rank} in FEN")]
    InvalidRank { rank: usize },
    /// Too many files in a rank
    #[error("Too many files ({files}) in rank {rank}")]
    TooManyFiles { rank: usize, files: usize },
}

/// Error type for move parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move string has invalid length (must be 4-5 characters)
    #[error("Move must be 4-5 characters, found {len}")]
    InvalidLength { len: usize },
    /// Invalid square notation in move
    #[error("Invalid square notation in '{notation}'")]
    InvalidSquare { notation: String },
    /// Invalid promotion piece
    #[error("Invalid promotion piece '{char}'")]
    InvalidPromotion { char: char },
    /// Move is not legal in the current position
    #[error("Illegal move '{notation}'")]
    IllegalMove { notation: String },
}

/// Error type for square parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    /// Rank out of bounds (must be 0-7)
    #[error("Rank {rank} out of bounds (must be 0-7)")]
    RankOutOfBounds { rank: usize },
    /// File out of bounds (must be 0-7)
    #[error("File {file} out of bounds (must be 0-7)")]
    FileOutOfBounds { file: usize },
    /// Invalid algebraic notation
    #[error("Invalid square notation '{notation}'")]
    InvalidNotation { notation: String },
}

/// Error type for SAN (Standard Algebraic Notation) parsing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SanError {
    /// Empty SAN string
    #[error("Empty SAN string")]
    Empty,
    /// Invalid piece character
    #[error("Invalid piece character '{char}' in SAN")]
    InvalidPiece { char: char },
    /// Invalid square in SAN
    #[error("Invalid square in SAN '{notation}'")]
    InvalidSquare { notation: String },
    /// Ambiguous move (multiple pieces can reach the target)
    #[error("Ambiguous move '{san}'")]
    AmbiguousMove { san: String },
    /// No matching legal move found
    #[error("No legal move matches '{san}'")]
    NoMatchingMove { san: String },
    /// Invalid promotion piece
    #[error("Invalid promotion piece '{char}'")]
    InvalidPromotion { char: char },
    /// Invalid castling notation
    #[error("Invalid castling notation '{notation}'")]
    InvalidCastling { notation: String },
}
