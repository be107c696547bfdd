//! Prometheus text exposition helpers
//!
//! The text parser is only compiled for tests and the `testing` feature.

/// Content type of the scrape endpoint
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[cfg(any(test, feature = "testing"))]
struct Sample<'a> {
    name: &'a str,
    labels: Vec<(&'a str, String)>,
    value: f64,
}

#[cfg(any(test, feature = "testing"))]
fn parse_line(line: &str) -> Option<Sample<'_>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (series, value) = line.rsplit_once(' ')?;
    let value = value.parse::<f64>().ok()?;

    let (name, labels) = match series.split_once('{') {
        Some((name, rest)) => (name, parse_labels(rest.strip_suffix('}')?)?),
        None => (series, Vec::new()),
    };

    Some(Sample { name, labels, value })
}

#[cfg(any(test, feature = "testing"))]
fn parse_labels(body: &str) -> Option<Vec<(&str, String)>> {
    let mut labels = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        let (key, after_key) = rest.split_once("=\"")?;

        let mut value = String::new();
        let mut chars = after_key.char_indices();
        let end = loop {
            match chars.next()? {
                (i, '"') => break i,
                (_, '\\') => match chars.next()?.1 {
                    'n' => value.push('\n'),
                    other => value.push(other),
                },
                (_, c) => value.push(c),
            }
        };

        labels.push((key.trim_start_matches(',').trim(), value));
        rest = after_key[end + 1..].trim_start_matches(',');
    }

    Some(labels)
}

#[cfg(any(test, feature = "testing"))]
/// Value of the sample of `family` whose labels include all of `labels`
pub fn sample_value(text: &str, family: &str, labels: &[(&str, &str)]) -> Option<f64> {
    text.lines()
        .filter_map(parse_line)
        .filter(|sample| sample.name == family)
        .find(|sample| {
            labels
                .iter()
                .all(|(k, v)| sample.labels.iter().any(|(sk, sv)| sk == k && sv == v))
        })
        .map(|sample| sample.value)
}

#[cfg(any(test, feature = "testing"))]
/// Sum of every sample of `family` across all label combinations
pub fn family_total(text: &str, family: &str) -> f64 {
    text.lines()
        .filter_map(parse_line)
        .filter(|sample| sample.name == family)
        .map(|sample| sample.value)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "\
# HELP predict_requests_total Total number of successful /predict requests
# TYPE predict_requests_total counter
predict_requests_total{prediction=\"positive\",version=\"1.0\"} 3
predict_requests_total{prediction=\"negative\",version=\"1.0\"} 2
predict_requests_total_extra 100
predict_errors_total{kind=\"inference_error\"} 1
process_up 1
";

    #[test]
    fn test_sample_value() {
        assert_eq!(
            sample_value(TEXT, "predict_requests_total", &[("prediction", "negative")]),
            Some(2.0)
        );
        assert_eq!(sample_value(TEXT, "process_up", &[]), Some(1.0));
        assert_eq!(sample_value(TEXT, "predict_errors_total", &[("kind", "validation_error")]), None);
    }

    #[test]
    fn test_family_total_matches_exact_name() {
        assert_eq!(family_total(TEXT, "predict_requests_total"), 5.0);
        assert_eq!(family_total(TEXT, "missing_total"), 0.0);
    }

    #[test]
    fn test_escaped_label_values() {
        let text = "m{v=\"a\\\"b\",w=\"c,d\"} 7\n";
        assert_eq!(sample_value(text, "m", &[("v", "a\"b"), ("w", "c,d")]), Some(7.0));
    }
}
