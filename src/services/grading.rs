/// Effective score: the manual override shadows the raw accumulated score
/// without ever mutating it.
pub(crate) fn effective_score(accumulated_score: f64, overridden_score: Option<f64>) -> f64 {
    overridden_score.unwrap_or(accumulated_score)
}

/// Pass determination, precedence totally ordered:
/// forced pass > percent threshold > degenerate fallback (`total_score <= 0`).
pub(crate) fn effective_passed(
    effective_score: f64,
    total_score: i32,
    pass_percent: i32,
    pass_override: bool,
) -> bool {
    if pass_override {
        return true;
    }

    if total_score > 0 {
        let percent = effective_score / f64::from(total_score) * 100.0;
        return percent >= f64::from(pass_percent);
    }

    effective_score > 0.0
}
