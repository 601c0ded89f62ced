//! Wire shapes for the streaming read path.
//!
//! A read response arrives as a sequence of messages, each carrying a row key
//! and a batch of chunks. A chunk is exactly one of three things: cell
//! contents to append, a reset signal, or a commit signal. [`Chunk::parse`]
//! enforces that shape before the stream driver ever touches accumulation
//! state.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One stored value as it travels on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireCell {
    pub timestamp_micros: i64,
    #[serde(with = "serde_bytes")]
    pub value: Vec<u8>,
}

impl WireCell {
    pub fn new(timestamp_micros: i64, value: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp_micros,
            value: value.into(),
        }
    }
}

/// Cells for one column qualifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnCells {
    #[serde(with = "serde_bytes")]
    pub qualifier: Vec<u8>,
    pub cells: Vec<WireCell>,
}

impl ColumnCells {
    pub fn new(qualifier: impl Into<Vec<u8>>, cells: Vec<WireCell>) -> Self {
        Self {
            qualifier: qualifier.into(),
            cells,
        }
    }
}

/// Cells for one column family, grouped by qualifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FamilyCells {
    pub name: String,
    pub columns: Vec<ColumnCells>,
}

impl FamilyCells {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnCells>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }
}

/// A chunk as transported: three optional fields of which exactly one must
/// be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireChunk {
    #[serde(default)]
    pub row_contents: Option<FamilyCells>,
    #[serde(default)]
    pub reset_row: Option<bool>,
    #[serde(default)]
    pub commit_row: Option<bool>,
}

impl WireChunk {
    pub fn cells(contents: FamilyCells) -> Self {
        Self {
            row_contents: Some(contents),
            reset_row: None,
            commit_row: None,
        }
    }

    pub fn reset() -> Self {
        Self {
            row_contents: None,
            reset_row: Some(true),
            commit_row: None,
        }
    }

    pub fn commit() -> Self {
        Self {
            row_contents: None,
            reset_row: None,
            commit_row: Some(true),
        }
    }
}

/// One message of a streaming read response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReadRowsMessage {
    #[serde(with = "serde_bytes")]
    pub row_key: Vec<u8>,
    pub chunks: Vec<WireChunk>,
}

impl ReadRowsMessage {
    pub fn new(row_key: impl Into<Vec<u8>>, chunks: Vec<WireChunk>) -> Self {
        Self {
            row_key: row_key.into(),
            chunks,
        }
    }
}

/// A validated chunk: the sum type the wire shape encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Cells(FamilyCells),
    Reset,
    Commit,
}

impl Chunk {
    /// Validates the one-of constraint. The signal fields may only carry
    /// `true`; a literal `false` has no meaning and marks a corrupt stream.
    pub fn parse(wire: WireChunk) -> Result<Self> {
        match (wire.row_contents, wire.reset_row, wire.commit_row) {
            (Some(contents), None, None) => Ok(Chunk::Cells(contents)),
            (None, Some(true), None) => Ok(Chunk::Reset),
            (None, Some(false), None) => Err(Error::MalformedStream("reset signal must be true")),
            (None, None, Some(true)) => Ok(Chunk::Commit),
            (None, None, Some(false)) => Err(Error::MalformedStream("commit signal must be true")),
            (None, None, None) => Err(Error::MalformedStream("empty chunk")),
            _ => Err(Error::MalformedStream("chunk sets more than one variant")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents() -> FamilyCells {
        FamilyCells::new(
            "cf1",
            vec![ColumnCells::new(b"col".as_slice(), vec![WireCell::new(1, b"v".as_slice())])],
        )
    }

    #[test]
    fn parse_single_variant_chunks_expected_ok() {
        assert_eq!(
            Chunk::parse(WireChunk::cells(contents())).unwrap(),
            Chunk::Cells(contents())
        );
        assert_eq!(Chunk::parse(WireChunk::reset()).unwrap(), Chunk::Reset);
        assert_eq!(Chunk::parse(WireChunk::commit()).unwrap(), Chunk::Commit);
    }

    #[test]
    fn parse_empty_chunk_expected_malformed() {
        let wire = WireChunk {
            row_contents: None,
            reset_row: None,
            commit_row: None,
        };
        let err = Chunk::parse(wire).unwrap_err();
        assert!(matches!(err, Error::MalformedStream("empty chunk")));
    }

    #[test]
    fn parse_two_variants_expected_malformed() {
        let wire = WireChunk {
            row_contents: Some(contents()),
            reset_row: None,
            commit_row: Some(true),
        };
        let err = Chunk::parse(wire).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedStream("chunk sets more than one variant")
        ));
    }

    #[test]
    fn parse_false_signals_expected_malformed() {
        let reset = WireChunk {
            row_contents: None,
            reset_row: Some(false),
            commit_row: None,
        };
        assert!(matches!(
            Chunk::parse(reset).unwrap_err(),
            Error::MalformedStream("reset signal must be true")
        ));

        let commit = WireChunk {
            row_contents: None,
            reset_row: None,
            commit_row: Some(false),
        };
        assert!(matches!(
            Chunk::parse(commit).unwrap_err(),
            Error::MalformedStream("commit signal must be true")
        ));
    }

    #[test]
    fn wire_chunk_roundtrips_through_msgpack() {
        let message = ReadRowsMessage::new(
            b"row-1".as_slice(),
            vec![WireChunk::cells(contents()), WireChunk::commit()],
        );
        let bytes = crate::encoding::encode_payload(&message).unwrap();
        let decoded: ReadRowsMessage = crate::encoding::decode_payload(&bytes).unwrap();
        assert_eq!(decoded, message);
    }
}
