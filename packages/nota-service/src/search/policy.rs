use nota_domain::RankedResult;

/// Descending relevance; ties keep stage-one order so repeated queries render identically.
pub fn sort_by_relevance(ranked: &mut [RankedResult]) {
	ranked.sort_by(|a, b| b.relevance.total_cmp(&a.relevance).then_with(|| a.id.cmp(&b.id)));
}

/// Keeps the `top_n` most relevant entries, then drops those scoring below `min_relevance`.
///
/// No padding: fewer than `top_n` entries may come back, including none.
pub fn select(
	mut ranked: Vec<RankedResult>,
	top_n: usize,
	min_relevance: f32,
) -> Vec<RankedResult> {
	sort_by_relevance(&mut ranked);
	ranked.truncate(top_n);
	ranked.retain(|result| result.relevance.meets(min_relevance));

	ranked
}
