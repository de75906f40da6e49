//! Splits ingested text into overlapping, sentence-aligned chunks before embedding.

const OVERLAP_SENTENCES: usize = 2;

/// Splits `text` on sentence boundaries (`.`, `!`, `?` followed by whitespace or end of
/// string), then packs sentences into chunks of at most `max_tokens` (measured by
/// whitespace word count), each chunk overlapping the previous by up to
/// [`OVERLAP_SENTENCES`] sentences so retrieval doesn't lose context at a chunk edge.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;
    let mut i = 0;

    while i < sentences.len() {
        let sentence = sentences[i];
        let sentence_tokens = sentence.split_whitespace().count();

        if !current.is_empty() && current_tokens + sentence_tokens > max_tokens {
            chunks.push(current.join(" "));
            let keep_from = current.len().saturating_sub(OVERLAP_SENTENCES);
            current = current[keep_from..].to_vec();
            current_tokens = current.iter().map(|s| s.split_whitespace().count()).sum();
        }

        current.push(sentence);
        current_tokens += sentence_tokens;
        i += 1;
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'.' || c == b'!' || c == b'?' {
            let next_is_boundary = i + 1 == bytes.len() || bytes[i + 1].is_ascii_whitespace();
            if next_is_boundary {
                let sentence = text[start..=i].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = i + 1;
            }
        }
        i += 1;
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_short_sentence_is_one_chunk() {
        let chunks = chunk_text("Hello world.", 128);
        assert_eq!(chunks, vec!["Hello world."]);
    }

    #[test]
    fn splits_on_sentence_boundaries_when_over_budget() {
        let text = "One two three four five. Six seven eight nine ten. Eleven twelve thirteen fourteen fifteen.";
        let chunks = chunk_text(text, 10);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn consecutive_chunks_overlap_by_two_sentences() {
        let text = "Sentence one is here. Sentence two follows next. Sentence three arrives after. Sentence four closes it out.";
        let chunks = chunk_text(text, 6);
        assert!(chunks.len() >= 2);
        // The overlap sentence(s) from the end of chunk N should reappear at the start of chunk N+1.
        let first_tail = chunks[0].split(". ").last().unwrap_or("");
        assert!(chunks[1].contains(first_tail.trim_end_matches('.')));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 128).is_empty());
        assert!(chunk_text("   ", 128).is_empty());
    }
}
