use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_OPEN: &str = "${{";
pub const DEFAULT_CLOSE: &str = "}}";

/// The token pair that wraps a templated expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Delimiters {
    pub fn new(open: &str, close: &str) -> Result<Self> {
        if open.is_empty() || close.is_empty() {
            return Err(ScanError::InvalidDelimiters(format!(
                "open ('{}') and close ('{}') tokens must be non-empty",
                open, close
            )));
        }
        if open.contains('\n') || close.contains('\n') {
            return Err(ScanError::InvalidDelimiters(
                "tokens must not contain line breaks".to_string(),
            ));
        }
        Ok(Self {
            open: open.to_string(),
            close: close.to_string(),
        })
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }
}

/// A templated expression payload found in a script body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    /// Text between the delimiters, surrounding whitespace trimmed.
    pub text: String,
    /// 1-based line within the script body.
    pub line: usize,
    /// 1-based character column of the open token.
    pub column: usize,
}

/// Extract `${{ ... }}` payloads from a script body.
pub fn extract_expressions(script: &str) -> Vec<Expression> {
    extract_with(script, &Delimiters::default())
}

/// Extract payloads using the given delimiters.
///
/// Scanning is lexical and line-bound. An open token with no close token
/// later on its line is dropped, as is an open token that is followed by a
/// second open token before the close. Empty payloads are skipped. Order and
/// duplicates are preserved.
pub fn extract_with(script: &str, delimiters: &Delimiters) -> Vec<Expression> {
    let open = delimiters.open.as_str();
    let close = delimiters.close.as_str();
    let mut expressions = Vec::new();

    for (line_idx, line) in script.lines().enumerate() {
        let mut cursor = 0;

        while let Some(rel) = line[cursor..].find(open) {
            let start = cursor + rel;
            let body_start = start + open.len();

            let Some(close_rel) = line[body_start..].find(close) else {
                break;
            };
            let body_end = body_start + close_rel;
            let inner = &line[body_start..body_end];

            if let Some(nested) = inner.rfind(open) {
                cursor = body_start + nested;
                continue;
            }

            let text = inner.trim();
            if !text.is_empty() {
                expressions.push(Expression {
                    text: text.to_string(),
                    line: line_idx + 1,
                    column: line[..start].chars().count() + 1,
                });
            }
            cursor = body_end + close.len();
        }
    }

    expressions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(script: &str) -> Vec<String> {
        extract_expressions(script).into_iter().map(|e| e.text).collect()
    }

    #[test]
    fn test_extracts_in_source_order_with_duplicates() {
        let script = "echo ${{ github.sha }} ${{ secrets.TOKEN }}\necho ${{ github.sha }}";
        assert_eq!(texts(script), vec!["github.sha", "secrets.TOKEN", "github.sha"]);
    }

    #[test]
    fn test_tolerates_missing_inner_whitespace() {
        let script = " echo ${{github.event.issue.title }}\n  if ${{ github.event.commits.arbitrary.data.message}} -ne 0";
        assert_eq!(
            texts(script),
            vec!["github.event.issue.title", "github.event.commits.arbitrary.data.message"]
        );
    }

    #[test]
    fn test_no_delimiters_yields_nothing() {
        assert!(extract_expressions("echo hello && make test").is_empty());
        assert!(extract_expressions("").is_empty());
        // Single braces belong to the shell or to other templating systems.
        assert!(extract_expressions("sed -i 's/{{ TOKEN }}/x/g' ${HOME}/f").is_empty());
    }

    #[test]
    fn test_unterminated_open_is_ignored() {
        let with_dangling = "echo ${{ github.event.issue.title\necho ${{ env.NAME }}";
        let without = "echo \necho ${{ env.NAME }}";
        assert_eq!(texts(with_dangling), texts(without));
        assert_eq!(texts(with_dangling), vec!["env.NAME"]);
    }

    #[test]
    fn test_expression_does_not_span_lines() {
        assert!(extract_expressions("echo ${{ github.sha\n}}").is_empty());
    }

    #[test]
    fn test_dangling_open_before_complete_expression() {
        let with_dangling = "echo ${{ broken ${{ github.sha }} done";
        let without = "echo ${{ github.sha }} done";
        assert_eq!(texts(with_dangling), texts(without));
    }

    #[test]
    fn test_empty_payload_is_skipped() {
        assert!(extract_expressions("echo ${{ }} ${{}}").is_empty());
    }

    #[test]
    fn test_positions_are_one_based() {
        let exprs = extract_expressions("make\n  echo ${{ github.sha }}");
        assert_eq!(exprs.len(), 1);
        assert_eq!(exprs[0].line, 2);
        assert_eq!(exprs[0].column, 8);
    }

    #[test]
    fn test_custom_delimiters() {
        let delimiters = Delimiters::new("$[[", "]]").unwrap();
        let exprs = extract_with("echo $[[ variables.name ]] ${{ github.sha }}", &delimiters);
        assert_eq!(exprs.len(), 1);
        assert_eq!(exprs[0].text, "variables.name");
    }

    #[test]
    fn test_empty_delimiters_rejected() {
        assert!(Delimiters::new("", "}}").is_err());
        assert!(Delimiters::new("${{", "").is_err());
    }

    #[test]
    fn test_counts_every_well_formed_expression() {
        let script: String = (0..25)
            .map(|i| format!("echo ${{{{ steps.s{}.outputs.v }}}} ;", i))
            .collect::<Vec<_>>()
            .join(" ");
        let exprs = extract_expressions(&script);
        assert_eq!(exprs.len(), 25);
        assert_eq!(exprs[0].text, "steps.s0.outputs.v");
        assert_eq!(exprs[24].text, "steps.s24.outputs.v");
    }
}
