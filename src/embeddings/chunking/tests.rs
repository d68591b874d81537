use super::*;

const ACT_EXCERPT: &str = "PART I - PRELIMINARY\n\n\
1. Short title\nThis Act may be cited as the Tax Procedures Act, 2015.\n\n\
2. Interpretation\nIn this Act, unless the context otherwise requires, \"Commissioner\" means the \
Commissioner-General appointed under the Kenya Revenue Authority Act. \"Tax law\" means this Act \
or any of the Acts specified in the First Schedule. Does the penalty apply? It applies to every \
taxpayer who fails to file a return! The Commissioner may extend the time for filing.\n\n\
3. Application\nThis Act shall apply to the taxes imposed under the tax laws specified in the \
First Schedule, and to the administration of those tax laws.";

fn config(chunk_size: usize, overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        chunk_size,
        overlap,
    }
}

/// Glue chunks back together using only the part of each chunk past the previous one
fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0;
    for chunk in chunks {
        let skip = covered - chunk.source_offset;
        out.push_str(&chunk.text[skip..]);
        covered = chunk.source_end();
    }
    out
}

#[test]
fn empty_text_yields_no_chunks() {
    let chunks = chunk_text("", &ChunkingConfig::default()).expect("chunking should succeed");
    assert!(chunks.is_empty());
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks =
        chunk_text("Section 42.", &ChunkingConfig::default()).expect("chunking should succeed");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Section 42.");
    assert_eq!(chunks[0].id, 0);
    assert_eq!(chunks[0].source_offset, 0);
}

#[test]
fn chunks_reconstruct_source_and_respect_size() {
    for (chunk_size, overlap) in [(40, 0), (40, 10), (64, 16), (120, 30), (25, 24), (1, 0)] {
        let cfg = config(chunk_size, overlap);
        let chunks = chunk_text(ACT_EXCERPT, &cfg).expect("chunking should succeed");

        assert!(chunks.len() > 1, "excerpt should need several chunks");
        assert_eq!(reconstruct(&chunks), ACT_EXCERPT);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i);
            assert!(!chunk.text.is_empty());
            assert!(chunk.text.chars().count() <= chunk_size);
            assert_eq!(
                &ACT_EXCERPT[chunk.source_offset..chunk.source_end()],
                chunk.text
            );
        }
    }
}

#[test]
fn consecutive_chunks_share_overlap() {
    let cfg = config(80, 20);
    let chunks = chunk_text(ACT_EXCERPT, &cfg).expect("chunking should succeed");

    for pair in chunks.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        assert!(next.source_offset < prev.source_end());
        let shared = &ACT_EXCERPT[next.source_offset..prev.source_end()];
        assert!(shared.chars().count() <= 20);
        assert!(prev.text.ends_with(shared));
        assert!(next.text.starts_with(shared));
    }
}

#[test]
fn zero_overlap_produces_disjoint_chunks() {
    let chunks = chunk_text(ACT_EXCERPT, &config(60, 0)).expect("chunking should succeed");
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].source_end(), pair[1].source_offset);
    }
}

#[test]
fn prefers_paragraph_boundaries() {
    let text = format!("{}\n\n{}", "a".repeat(30), "b".repeat(30));
    let chunks = chunk_text(&text, &config(50, 0)).expect("chunking should succeed");

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].text, format!("{}\n\n", "a".repeat(30)));
    assert_eq!(chunks[1].text, "b".repeat(30));
}

#[test]
fn falls_back_to_sentence_then_word_boundaries() {
    let text = "First sentence is here. Second sentence follows it closely";
    let chunks = chunk_text(text, &config(40, 0)).expect("chunking should succeed");
    assert_eq!(chunks[0].text, "First sentence is here. ");

    let words = "alpha beta gamma delta epsilon zeta eta theta";
    let chunks = chunk_text(words, &config(20, 0)).expect("chunking should succeed");
    assert!(chunks[0].text.ends_with(' '));
    assert_eq!(reconstruct(&chunks), words);
}

#[test]
fn hard_cuts_text_without_separators() {
    let text = "x".repeat(95);
    let chunks = chunk_text(&text, &config(30, 5)).expect("chunking should succeed");

    assert_eq!(chunks[0].text.len(), 30);
    assert!(chunks.iter().all(|c| c.text.len() <= 30));
    assert_eq!(reconstruct(&chunks), text);
}

#[test]
fn multibyte_text_is_split_on_char_boundaries() {
    let text = "Kodi ya mapato — ushuru wa forodha € ".repeat(12);
    let chunks = chunk_text(&text, &config(33, 7)).expect("chunking should succeed");

    assert_eq!(reconstruct(&chunks), text);
    assert!(chunks.iter().all(|c| c.text.chars().count() <= 33));
}

#[test]
fn rejects_invalid_config() {
    assert_eq!(
        chunk_text("text", &config(0, 0)),
        Err(ChunkingError::ZeroChunkSize)
    );
    assert_eq!(
        chunk_text("text", &config(10, 10)),
        Err(ChunkingError::OverlapTooLarge {
            overlap: 10,
            chunk_size: 10
        })
    );
}
