use nota_domain::RankedResult;

const SEPARATOR: &str = "\n\n---\n\n";

/// Renders each result with its relevance (three decimals), source file and full text.
pub fn format_results(results: &[RankedResult]) -> String {
	results
		.iter()
		.enumerate()
		.map(|(rank, result)| {
			format!(
				"[{}] Relevance: {:.3} | Source: {}\n{}",
				rank + 1,
				result.relevance.value(),
				result.chunk.metadata.source_label(),
				result.chunk.text
			)
		})
		.collect::<Vec<_>>()
		.join(SEPARATOR)
}
