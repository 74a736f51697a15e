//! Recursive character splitting for note ingestion.
//!
//! Text is cut on the coarsest separator present (blank lines, then line breaks, then spaces,
//! then grapheme boundaries) and the pieces are merged back into chunks of at most
//! `chunk_chars` characters, each sharing up to `overlap_chars` characters with its predecessor.

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub chunk_chars: usize,
	pub overlap_chars: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
	pub chunk_index: usize,
	/// Byte offset of `text` in the source.
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let pieces = split_recursive(text, &SEPARATORS, cfg);
	let mut chunks = Vec::with_capacity(pieces.len());
	let mut search_from = 0_usize;

	for (chunk_index, piece) in pieces.into_iter().enumerate() {
		let start_offset = match text[search_from..].find(piece.as_str()) {
			Some(pos) => {
				let start = search_from + pos;

				search_from = start + piece.chars().next().map(char::len_utf8).unwrap_or(0);

				start
			},
			None => search_from,
		};

		chunks.push(Chunk {
			chunk_index,
			start_offset,
			end_offset: start_offset + piece.len(),
			text: piece,
		});
	}

	chunks
}

fn split_recursive(text: &str, separators: &[&str], cfg: &ChunkingConfig) -> Vec<String> {
	let position = separators.iter().position(|separator| text.contains(separator));
	let (splits, remaining): (Vec<&str>, &[&str]) = match position {
		Some(index) =>
			(split_keep_separator(text, separators[index]), &separators[index + 1..]),
		None => (text.graphemes(true).collect(), &[]),
	};
	let mut out = Vec::new();
	let mut pending = Vec::new();

	for split in splits {
		if char_len(split) < cfg.chunk_chars {
			pending.push(split);

			continue;
		}
		if !pending.is_empty() {
			out.extend(merge_splits(&pending, cfg));
			pending.clear();
		}

		if position.is_some() {
			out.extend(split_recursive(split, remaining, cfg));
		} else {
			push_trimmed(&mut out, split);
		}
	}

	if !pending.is_empty() {
		out.extend(merge_splits(&pending, cfg));
	}

	out
}

/// Splits on `separator`, keeping it at the start of the following piece.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
	let mut out = Vec::new();
	let mut start = 0;

	for (index, _) in text.match_indices(separator) {
		if index > start {
			out.push(&text[start..index]);
		}

		start = index;
	}

	if start < text.len() {
		out.push(&text[start..]);
	}

	out
}

fn merge_splits(splits: &[&str], cfg: &ChunkingConfig) -> Vec<String> {
	let mut docs = Vec::new();
	let mut current: VecDeque<&str> = VecDeque::new();
	let mut total = 0_usize;

	for split in splits {
		let len = char_len(split);

		if total + len > cfg.chunk_chars && !current.is_empty() {
			push_trimmed(&mut docs, &current.iter().copied().collect::<String>());

			while total > cfg.overlap_chars || (total + len > cfg.chunk_chars && total > 0) {
				let Some(front) = current.pop_front() else { break };

				total -= char_len(front);
			}
		}

		current.push_back(split);
		total += len;
	}

	push_trimmed(&mut docs, &current.iter().copied().collect::<String>());

	docs
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
	let trimmed = text.trim();

	if !trimmed.is_empty() {
		out.push(trimmed.to_string());
	}
}

fn char_len(text: &str) -> usize {
	text.chars().count()
}
