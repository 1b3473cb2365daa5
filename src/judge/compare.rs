use similar::{ChangeTag, TextDiff};
use std::fmt;

/// Drops trailing whitespace from every line and ends each line with `\n`,
/// so a missing final newline does not count. Line structure is kept.
pub fn normalize(s: &str) -> String {
    s.lines().map(|line| format!("{}\n", line.trim_end())).collect()
}

pub fn same_output(output: &str, answer: &str) -> bool {
    normalize(output) == normalize(answer)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffTag {
    Equal,
    /// Present in the answer, absent from the output.
    Missing,
    /// Printed by the program but not in the answer.
    Extra,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffToken {
    pub tag: DiffTag,
    pub text: String,
}

/// Everything the presentation layer needs to show a wrong answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub input: String,
    pub output: String,
    pub answer: String,
    pub diff: Vec<DiffToken>,
}

impl Mismatch {
    pub fn new(input: String, output: String, answer: String) -> Self {
        let diff = word_diff(&normalize(&output), &normalize(&answer));
        Self {
            input,
            output,
            answer,
            diff,
        }
    }

    pub fn has_differences(&self) -> bool {
        self.diff.iter().any(|t| t.tag != DiffTag::Equal)
    }

    pub fn render_diff(&self) -> String {
        self.diff
            .iter()
            .map(|t| match t.tag {
                DiffTag::Equal => t.text.clone(),
                DiffTag::Missing => format!("{{+{}+}}", t.text),
                DiffTag::Extra => format!("[-{}-]", t.text),
            })
            .collect()
    }

    pub fn sections(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Input", self.input.clone()),
            ("Output", self.output.clone()),
            ("Answer", self.answer.clone()),
            ("Diff", self.render_diff()),
        ]
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, body) in self.sections() {
            writeln!(f, "{}:", label)?;
            write!(f, "{}", body)?;
            if !body.ends_with('\n') {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

fn word_diff(output: &str, answer: &str) -> Vec<DiffToken> {
    let diff = TextDiff::from_words(output, answer);
    let mut tokens: Vec<DiffToken> = vec![];
    for change in diff.iter_all_changes() {
        let tag = match change.tag() {
            ChangeTag::Equal => DiffTag::Equal,
            ChangeTag::Delete => DiffTag::Extra,
            ChangeTag::Insert => DiffTag::Missing,
        };
        match tokens.last_mut() {
            Some(last) if last.tag == tag => last.text.push_str(change.value()),
            _ => tokens.push(DiffToken {
                tag,
                text: change.value().to_string(),
            }),
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_space_is_ignored() {
        assert!(same_output("4\n", "4 \n"));
        assert!(same_output("1 2\r\n3\n", "1 2\n3\n"));
        assert!(same_output("4", "4\n"));
        assert!(same_output("1 2 \n3", "1 2\n3\n"));
        assert!(!same_output("", "4\n"));
    }

    #[test]
    fn test_extra_line_is_a_mismatch() {
        assert!(!same_output("4\n5\n", "4\n"));
        let m = Mismatch::new("1\n".into(), "4\n5\n".into(), "4\n".into());
        assert!(m.has_differences());
        assert!(m.diff.iter().any(|t| t.tag == DiffTag::Extra && t.text.contains('5')));
    }

    #[test]
    fn test_render_sections() {
        let m = Mismatch::new("2 2\n".into(), "5\n".into(), "4\n".into());
        assert_eq!(m.render_diff(), "[-5-]{+4+}\n");
        let shown = m.to_string();
        assert!(shown.starts_with("Input:\n2 2\n"));
        assert!(shown.contains("Output:\n5\n"));
        assert!(shown.contains("Answer:\n4\n"));
        assert!(shown.contains("Diff:\n[-5-]{+4+}\n"));
    }
}
