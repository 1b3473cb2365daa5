use crate::error::Error;
use crate::submission::Submission;
use anyhow::anyhow;
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::str::FromStr;

/// Pulls structured data out of judge pages.
pub trait Extractor: Send + Sync {
    fn parse_submission_list(&self, html: &str) -> anyhow::Result<Vec<Submission>>;

    fn extract_code(&self, html: &str) -> anyhow::Result<String>;

    fn extract_judge_message(&self, html: &str) -> Option<String>;

    /// Sample (input, output) pairs in page order.
    fn extract_samples(&self, html: &str) -> anyhow::Result<Vec<(String, String)>>;

    fn extract_csrf(&self, html: &str) -> Option<String>;
}

pub fn get_text_of_element(ele: ElementRef) -> String {
    ele.text().map(|t| t.trim()).collect::<Vec<_>>().concat()
}

/// Like [`get_text_of_element`] but keeps a space between text nodes, so
/// `on test <span>2</span>` stays `on test 2`.
pub fn get_spaced_text_of_element(ele: ElementRef) -> String {
    ele.text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

//提取字符串中唯一的正整数
pub fn extract_integer<F: FromStr + Default>(s: &str) -> F {
    let l = s.find(|x: char| x.is_ascii_digit()).unwrap_or(s.len());
    if l == s.len() {
        return F::default();
    }
    let r = s.rfind(|x: char| x.is_ascii_digit()).unwrap_or(0) + 1;
    s[l..r].parse().unwrap_or_default()
}

fn selector(s: &str) -> Selector {
    // every selector in this file is a literal
    Selector::parse(s).unwrap()
}

/// `<pre>` blocks either hold raw text or one `div` per line.
fn get_text_of_pre(pre: ElementRef) -> String {
    let line = selector("div");
    let lines: Vec<String> = pre
        .select(&line)
        .map(|d| d.text().collect::<String>())
        .collect();
    let mut text = if lines.is_empty() {
        pre.text().collect::<String>()
    } else {
        lines.join("\n")
    };
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

/// Splits `/contest/1812/problem/I` style links into (contest id, index).
fn split_problem_href(href: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = href.split('/').filter(|p| !p.is_empty()).collect();
    let pos = parts.iter().position(|p| *p == "problem")?;
    let index = parts.get(pos + 1..)?;
    match index {
        [contest, idx] => Some((contest.to_string(), idx.to_string())),
        [idx] => {
            let contest = parts.get(pos.checked_sub(1)?)?;
            Some((contest.to_string(), idx.to_string()))
        }
        _ => None,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CodeforcesPage;

impl Extractor for CodeforcesPage {
    fn parse_submission_list(&self, html: &str) -> anyhow::Result<Vec<Submission>> {
        let document = Html::parse_document(html);
        let row = selector(r#"tr[data-submission-id]"#);
        let cell = selector("td");
        let problem_link = selector(r#"td[data-problemid] a"#);
        let verdict_span = selector(r#"span[submissionverdict]"#);

        let mut res = vec![];
        for tr in document.select(&row) {
            let raw_id = tr.value().attr("data-submission-id").unwrap_or_default();
            let id = raw_id
                .parse::<u64>()
                .map_err(|_| Error::Malformed(format!("submission id {:?}", raw_id)))?;
            let cells: Vec<ElementRef> = tr.select(&cell).collect();
            if cells.len() < 8 {
                let msg = format!("submission {} has {} cells", id, cells.len());
                return Err(Error::Malformed(msg).into());
            }
            let (contest_id, problem_index) = tr
                .select(&problem_link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(split_problem_href)
                .unwrap_or_default();
            let mut status = get_spaced_text_of_element(cells[5]);
            if status.is_empty() {
                status = tr
                    .select(&verdict_span)
                    .next()
                    .and_then(|s| s.value().attr("submissionverdict"))
                    .unwrap_or_default()
                    .to_string();
            }
            res.push(Submission {
                id,
                contest_id,
                problem_index: problem_index.to_uppercase(),
                status,
                lang: get_text_of_element(cells[4]),
                when: get_text_of_element(cells[1]),
                time_ms: extract_integer(&get_text_of_element(cells[6])),
                memory_bytes: extract_integer::<u64>(&get_text_of_element(cells[7])) * 1024,
            });
        }
        Ok(res)
    }

    fn extract_code(&self, html: &str) -> anyhow::Result<String> {
        if let Some(msg) = self.extract_judge_message(html) {
            return Err(Error::JudgeMessage(msg).into());
        }
        let document = Html::parse_document(html);
        let source = selector(r#"pre[id="program-source-text"]"#);
        match document.select(&source).next() {
            Some(pre) => Ok(pre.text().collect()),
            None => Err(Error::Malformed("no source code block in page".into()).into()),
        }
    }

    fn extract_judge_message(&self, html: &str) -> Option<String> {
        static RE: OnceCell<Regex> = OnceCell::new();
        let re = RE.get_or_init(|| {
            Regex::new(r#"Codeforces\.showMessage\("((?:[^"\\]|\\.)*)"\)"#).unwrap()
        });
        re.captures(html)
            .map(|cap| cap[1].replace("\\\"", "\"").replace("\\n", "\n"))
            .filter(|m| !m.trim().is_empty())
    }

    fn extract_samples(&self, html: &str) -> anyhow::Result<Vec<(String, String)>> {
        let document = Html::parse_document(html);
        let inputs: Vec<String> = document
            .select(&selector(r#"div[class="input"] pre"#))
            .map(get_text_of_pre)
            .collect();
        let outputs: Vec<String> = document
            .select(&selector(r#"div[class="output"] pre"#))
            .map(get_text_of_pre)
            .collect();
        if inputs.len() != outputs.len() {
            return Err(anyhow!(
                "{} sample inputs but {} sample outputs",
                inputs.len(),
                outputs.len()
            ));
        }
        Ok(inputs.into_iter().zip(outputs).collect())
    }

    fn extract_csrf(&self, html: &str) -> Option<String> {
        static RE: OnceCell<Regex> = OnceCell::new();
        let re = RE.get_or_init(|| {
            Regex::new(r#"name="X-Csrf-Token"\s+content="([[:alnum:]]+)""#).unwrap()
        });
        re.captures(html).map(|cap| cap[1].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::Verdict;

    const LIST: &str = r#"<table class="status-frame-datatable">
<tr><th>#</th></tr>
<tr data-submission-id="201">
  <td>201</td><td>2023-04-01 12:00</td><td>tourist</td>
  <td data-problemid="9"><a href="/contest/1812/problem/I">I - Later</a></td>
  <td>GNU C++17</td>
  <td class="status-cell"><span class="submissionVerdictWrapper" submissionverdict="TESTING">Running on test 4</span></td>
  <td>15 ms</td><td>100 KB</td>
</tr>
<tr data-submission-id="200">
  <td>200</td><td>2023-04-01 11:00</td><td>tourist</td>
  <td data-problemid="9"><a href="/gym/104279/problem/b">B - Gym</a></td>
  <td>Python 3</td>
  <td class="status-cell"><span submissionverdict="WRONG_ANSWER">Wrong answer on test 2</span></td>
  <td>46 ms</td><td>3600 KB</td>
</tr>
</table>"#;

    #[test]
    fn test_parse_submission_list() {
        let subs = CodeforcesPage.parse_submission_list(LIST).unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].id, 201);
        assert_eq!(subs[0].problem(), "1812I");
        assert!(!subs[0].is_terminal());
        assert_eq!(subs[1].contest_id, "104279");
        assert_eq!(subs[1].problem_index, "B");
        assert_eq!(subs[1].time_ms, 46);
        assert_eq!(subs[1].memory_bytes, 3600 * 1024);
        assert_eq!(
            subs[1].verdict(),
            Verdict::Rejected {
                reason: "Wrong answer".into(),
                test: Some(2)
            }
        );
    }

    #[test]
    fn test_status_keeps_test_number_apart() {
        let html = r#"<table><tr data-submission-id="5">
  <td>5</td><td>now</td><td>tourist</td>
  <td data-problemid="1"><a href="/contest/4/problem/A">A</a></td>
  <td>GNU C++17</td>
  <td><span submissionverdict="WRONG_ANSWER">Wrong answer on test <span class="verdict-format-judged">2</span></span></td>
  <td>15 ms</td><td>0 KB</td>
</tr></table>"#;
        let subs = CodeforcesPage.parse_submission_list(html).unwrap();
        assert_eq!(subs[0].status, "Wrong answer on test 2");
        assert_eq!(
            subs[0].verdict(),
            Verdict::Rejected {
                reason: "Wrong answer".into(),
                test: Some(2)
            }
        );
    }

    #[test]
    fn test_malformed_row() {
        let html = r#"<table><tr data-submission-id="x"><td>1</td></tr></table>"#;
        let err = CodeforcesPage.parse_submission_list(html).unwrap_err();
        assert!(matches!(Error::of(&err), Some(Error::Malformed(_))));
    }

    #[test]
    fn test_extract_code_and_message() {
        let page = r#"<pre id="program-source-text" class="prettyprint">int main() { return 0; }
</pre>"#;
        assert_eq!(
            CodeforcesPage.extract_code(page).unwrap(),
            "int main() { return 0; }\n"
        );

        let denied = r#"<script>Codeforces.showMessage("You are not allowed to view the requested page");</script>"#;
        let err = CodeforcesPage.extract_code(denied).unwrap_err();
        assert_eq!(
            Error::of(&err),
            Some(&Error::JudgeMessage(
                "You are not allowed to view the requested page".into()
            ))
        );
    }

    #[test]
    fn test_extract_samples() {
        let page = r#"<div class="sample-test">
<div class="input"><div class="title">Input</div><pre><div class="test-example-line">1 2</div><div class="test-example-line">3</div></pre></div>
<div class="output"><div class="title">Output</div><pre>6</pre></div>
</div>"#;
        let samples = CodeforcesPage.extract_samples(page).unwrap();
        assert_eq!(samples, vec![("1 2\n3\n".to_string(), "6\n".to_string())]);
    }

    #[test]
    fn test_extract_csrf() {
        let page = r#"<meta name="X-Csrf-Token" content="abc123"/>"#;
        assert_eq!(CodeforcesPage.extract_csrf(page), Some("abc123".into()));
        assert_eq!(CodeforcesPage.extract_csrf("<html/>"), None);
    }

    #[test]
    fn test_helpers() {
        assert_eq!(extract_integer::<u32>("3600 KB"), 3600);
        assert_eq!(extract_integer::<u32>("none"), 0);
        assert_eq!(
            split_problem_href("/problemsets/acmsguru/problem/99999/100"),
            Some(("99999".into(), "100".into()))
        );
    }
}
