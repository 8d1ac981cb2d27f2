//! Tantivy schema for the chunk docstore.
//!
//! The docstore holds chunk payloads and source metadata; similarity search
//! itself runs against the flat vector file, keyed by chunk ID.

use tantivy::schema::{FAST, Field, STORED, STRING, Schema, SchemaBuilder, TEXT};

/// Schema fields for chunk payload storage.
#[derive(Debug, Clone)]
pub struct ChunkSchema {
    /// Document type discriminator (always "chunk" for this index).
    pub doc_type: Field,

    /// Unique identifier for this chunk.
    pub chunk_id: Field,

    /// Source file path.
    pub source_path: Field,

    /// Page number within the source file (1-based).
    pub page_number: Field,

    /// Position of the chunk within its page (0-based).
    pub chunk_index: Field,

    /// Full chunk content.
    pub content: Field,

    /// Content preview (first ~200 chars) for display.
    pub content_preview: Field,

    /// Character count for the chunk.
    pub char_count: Field,

    /// Timestamp when indexed (UTC seconds).
    pub indexed_at: Field,
}

impl ChunkSchema {
    /// Build the schema for chunk payload storage.
    pub fn build() -> (Schema, Self) {
        let mut builder = SchemaBuilder::default();

        let doc_type = builder.add_text_field("doc_type", STRING | STORED);

        // Chunk ID - indexed for payload lookup by ID
        let chunk_id = builder.add_u64_field(
            "chunk_id",
            tantivy::schema::NumericOptions::default()
                .set_indexed()
                .set_stored()
                .set_fast(),
        );

        // Source path - STRING for exact matching
        let source_path = builder.add_text_field("source_path", STRING | STORED);

        let page_number = builder.add_u64_field("page_number", STORED);
        let chunk_index = builder.add_u64_field("chunk_index", STORED);

        // Full content - TEXT so payloads stay inspectable with tantivy tooling
        let content = builder.add_text_field("content", TEXT | STORED);

        // Preview - STORED only, not indexed
        let content_preview = builder.add_text_field("content_preview", STORED);

        let char_count = builder.add_u64_field("char_count", STORED);
        let indexed_at = builder.add_u64_field("indexed_at", STORED | FAST);

        let schema = builder.build();

        let chunk_schema = Self {
            doc_type,
            chunk_id,
            source_path,
            page_number,
            chunk_index,
            content,
            content_preview,
            char_count,
            indexed_at,
        };

        (schema, chunk_schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_build() {
        let (schema, _fields) = ChunkSchema::build();

        assert!(schema.get_field("doc_type").is_ok());
        assert!(schema.get_field("chunk_id").is_ok());
        assert!(schema.get_field("source_path").is_ok());
        assert!(schema.get_field("page_number").is_ok());
        assert!(schema.get_field("chunk_index").is_ok());
        assert!(schema.get_field("content").is_ok());
        assert!(schema.get_field("content_preview").is_ok());
        assert!(schema.get_field("char_count").is_ok());
        assert!(schema.get_field("indexed_at").is_ok());

        assert_eq!(schema.fields().count(), 9);
    }
}
