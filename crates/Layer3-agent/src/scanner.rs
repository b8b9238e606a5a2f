//! JSON span scanner
//!
//! 모델 출력 안에 섞여 있는 JSON 객체의 범위를 찾는 작은 상태 기계입니다.
//! 문자열 안의 중괄호와 이스케이프를 추적하므로 중첩된 파라미터나
//! `"{"` 같은 문자열 값에도 범위가 틀어지지 않습니다. 디코딩은 하지 않습니다.
//!
//! ```text
//!   outside ──'{'──▶ depth=1 ──'"'──▶ in_string ──'\\'──▶ escaped
//!      ▲               │  ▲              │  ▲                │
//!      └──depth==0─────┘  └─────'"'──────┘  └──any char──────┘
//! ```

use std::ops::Range;

/// Result of feeding one character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Not inside a span yet
    Outside,
    /// Inside an open span
    Inside,
    /// This character closed the span
    Closed,
}

/// Brace-depth scanner with string and escape state
#[derive(Debug, Clone, Default)]
pub struct JsonSpanScanner {
    depth: usize,
    in_string: bool,
    escaped: bool,
}

impl JsonSpanScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn in_string(&self) -> bool {
        self.in_string
    }

    /// Advance the state machine by one character
    pub fn feed(&mut self, c: char) -> ScanStep {
        if self.depth == 0 {
            if c == '{' {
                self.depth = 1;
                return ScanStep::Inside;
            }
            return ScanStep::Outside;
        }

        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return ScanStep::Inside;
        }

        match c {
            '"' => self.in_string = true,
            '{' => self.depth += 1,
            '}' => {
                self.depth -= 1;
                if self.depth == 0 {
                    return ScanStep::Closed;
                }
            }
            _ => {}
        }
        ScanStep::Inside
    }

    /// 시작 위치부터 첫 번째 완결된 `{...}` 범위 (바이트 인덱스)
    ///
    /// 닫히지 않은 채로 입력이 끝나면 `None`
    pub fn find_span(text: &str, from: usize) -> Option<Range<usize>> {
        let tail = text.get(from..)?;
        let mut scanner = Self::new();
        let mut start = None;

        for (offset, c) in tail.char_indices() {
            match scanner.feed(c) {
                ScanStep::Outside => {}
                ScanStep::Inside => {
                    if start.is_none() {
                        start = Some(from + offset);
                    }
                }
                ScanStep::Closed => {
                    let begin = start.unwrap_or(from + offset);
                    return Some(begin..from + offset + c.len_utf8());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(text: &str) -> Option<&str> {
        JsonSpanScanner::find_span(text, 0).map(|r| &text[r])
    }

    #[test]
    fn test_simple_object() {
        assert_eq!(span(r#"Action: {"a": 1} tail"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let text = r#"x {"a": {"b": [1, {"c": 2}]}, "d": []} y"#;
        assert_eq!(span(text), Some(r#"{"a": {"b": [1, {"c": 2}]}, "d": []}"#));
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"content": "if (x) { y } }}}", "n": 1} rest"#;
        assert_eq!(span(text), Some(r#"{"content": "if (x) { y } }}}", "n": 1}"#));
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let text = r#"{"q": "say \"}\" now"} after"#;
        assert_eq!(span(text), Some(r#"{"q": "say \"}\" now"}"#));
    }

    #[test]
    fn test_escaped_backslash_before_quote() {
        let text = r#"{"path": "C:\\", "x": "}"}"#;
        assert_eq!(span(text), Some(text));
    }

    #[test]
    fn test_unbalanced_returns_none() {
        assert_eq!(span(r#"{"a": {"b": 1}"#), None);
        assert_eq!(span("no braces here"), None);
    }

    #[test]
    fn test_start_offset_and_multibyte() {
        let text = r#"{"first": 1} and {"word": "adiós"}"#;
        let first = JsonSpanScanner::find_span(text, 0).unwrap();
        let second = JsonSpanScanner::find_span(text, first.end).unwrap();
        assert_eq!(&text[second], r#"{"word": "adiós"}"#);
    }

    #[test]
    fn test_state_tracking() {
        let mut scanner = JsonSpanScanner::new();
        assert_eq!(scanner.feed('a'), ScanStep::Outside);
        assert_eq!(scanner.feed('{'), ScanStep::Inside);
        assert_eq!(scanner.feed('"'), ScanStep::Inside);
        assert!(scanner.in_string());
        assert_eq!(scanner.feed('}'), ScanStep::Inside);
        assert_eq!(scanner.depth(), 1);
        scanner.feed('"');
        assert_eq!(scanner.feed('}'), ScanStep::Closed);
        assert_eq!(scanner.depth(), 0);
    }
}
