//! Builds the word-level tokenizer artifact consumed by the API.
//!
//! Usage: make-tokenizer <labeled.csv> <text-column> <out.json> [vocab-size]
//!
//! Reads the named text column from a CSV of historical labeled resumes,
//! builds a frequency-capped vocabulary with `[PAD]` = 0 and `[UNK]` = 1
//! reserved, and saves it in `tokenizers` JSON format. The API loads the
//! resulting file via `TOKENIZER_PATH`.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use tokenizers::models::wordlevel::WordLevel;
use tokenizers::pre_tokenizers::whitespace::Whitespace;
use tokenizers::Tokenizer;

const PAD_TOKEN: &str = "[PAD]";
const UNK_TOKEN: &str = "[UNK]";
const DEFAULT_VOCAB_SIZE: usize = 5000;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let [csv_path, column, out_path, rest @ ..] = args.as_slice() else {
        bail!("usage: make-tokenizer <labeled.csv> <text-column> <out.json> [vocab-size]");
    };
    let vocab_size = match rest {
        [] => DEFAULT_VOCAB_SIZE,
        [size] => size
            .parse()
            .context("vocab-size must be a positive integer")?,
        _ => bail!("usage: make-tokenizer <labeled.csv> <text-column> <out.json> [vocab-size]"),
    };

    let texts = read_column(Path::new(csv_path), column)?;
    if texts.is_empty() {
        bail!("column \"{column}\" in {csv_path} holds no text");
    }

    let vocab = build_vocab(&texts, vocab_size);
    let word_count = vocab.len() - 2; // minus the reserved sentinels

    let model = WordLevel::builder()
        .vocab(vocab)
        .unk_token(UNK_TOKEN.to_string())
        .build()
        .map_err(|e| anyhow!("failed to build word-level model: {e}"))?;
    let mut tokenizer = Tokenizer::new(model);
    tokenizer.with_pre_tokenizer(Some(Whitespace {}));

    tokenizer
        .save(out_path, true)
        .map_err(|e| anyhow!("failed to save tokenizer to {out_path}: {e}"))?;

    println!("Wrote {out_path} ({word_count} words from {} rows)", texts.len());
    Ok(())
}

fn read_column(path: &Path, column: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = reader.headers().context("failed to read CSV header")?;
    let index = headers
        .iter()
        .position(|h| h == column)
        .with_context(|| format!("no column named \"{column}\" in {}", path.display()))?;

    let mut texts = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read CSV record")?;
        if let Some(value) = record.get(index) {
            let value = value.trim();
            if !value.is_empty() {
                texts.push(value.to_string());
            }
        }
    }
    Ok(texts)
}

/// Lowercased word frequencies, capped at `vocab_size` entries. Ties break
/// alphabetically so repeated runs produce the same artifact.
fn build_vocab(texts: &[String], vocab_size: usize) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for text in texts {
        for word in text.to_lowercase().split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric());
            if !word.is_empty() {
                *counts.entry(word.to_string()).or_default() += 1;
            }
        }
    }

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut vocab = HashMap::from([
        (PAD_TOKEN.to_string(), 0u32),
        (UNK_TOKEN.to_string(), 1u32),
    ]);
    for (word, _) in ranked.into_iter().take(vocab_size) {
        let id = vocab.len() as u32;
        vocab.insert(word, id);
    }
    vocab
}
