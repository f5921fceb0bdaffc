//! Sample query files
//!
//! One query per line. Blank lines and `#` comments are skipped, and a
//! leading `N) ` numbering is removed.

use std::path::Path;

use crate::error::Result;

/// Extract the queries from a sample file's contents
pub fn parse_samples(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(strip_numbering)
        .filter(|query| !query.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_numbering(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    match rest.strip_prefix(')') {
        Some(query) if query.is_empty() || query.starts_with(' ') => query.trim(),
        _ => line,
    }
}

/// Read and parse a sample file
pub async fn load_samples(path: &Path) -> Result<Vec<String>> {
    let contents = tokio::fs::read_to_string(path).await?;
    let queries = parse_samples(&contents);
    log::info!("Loaded {} sample quer(y/ies) from {:?}", queries.len(), path);
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_samples() {
        let contents = "\
# Performance
1) Which tactic had the best ROI in Q1?
2) How did Email perform in Oncology?

# Reference
What cadence do you recommend for email?
10) Summarize display benchmarks
";
        assert_eq!(
            parse_samples(contents),
            vec![
                "Which tactic had the best ROI in Q1?",
                "How did Email perform in Oncology?",
                "What cadence do you recommend for email?",
                "Summarize display benchmarks",
            ]
        );
    }

    #[test]
    fn test_numbering_needs_leading_digit() {
        assert_eq!(
            parse_samples("Compare (a) and (b) channels"),
            vec!["Compare (a) and (b) channels"]
        );
        assert_eq!(parse_samples("2025) spend by quarter"), vec!["spend by quarter"]);
        assert!(parse_samples("3) \n#only comment\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_load_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.txt");
        std::fs::write(&path, "1) first\n2) second\n").unwrap();

        assert_eq!(load_samples(&path).await.unwrap(), vec!["first", "second"]);
        assert!(load_samples(&dir.path().join("missing.txt")).await.is_err());
    }
}
