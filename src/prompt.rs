use crate::attachment::Attachment;
use crate::config::ToggleConfig;

const DEEP_SEARCH_SUFFIX: &str = "\n\n(Deep search enabled)";
const WEB_SEARCH_SUFFIX: &str = "\n\n(Web search enabled)";
const MARKDOWN_SUFFIX: &str =
    "\n\n(Please format the answer in Markdown and put the final result in a code block)";

/// Merge the raw input, the optional attachment, and the active toggles into
/// one outbound message. Returns `None` when there is nothing to send; this
/// is the engine's only validation gate before a network call.
///
/// Deterministic: identical inputs produce byte-identical output.
pub fn compose(
    user_text: &str,
    attachment: Option<&Attachment>,
    toggles: ToggleConfig,
) -> Option<String> {
    if user_text.trim().is_empty() && attachment.is_none() {
        return None;
    }

    let mut prompt = match attachment {
        Some(file) => format!(
            "[Uploaded file content]:\n{}\n\n[My question]:\n{}",
            file.content, user_text
        ),
        None => user_text.to_string(),
    };

    if toggles.deep_search {
        prompt.push_str(DEEP_SEARCH_SUFFIX);
    }
    if toggles.web_search {
        prompt.push_str(WEB_SEARCH_SUFFIX);
    }
    if toggles.markdown_output {
        prompt.push_str(MARKDOWN_SUFFIX);
    }

    Some(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toggles(deep: bool, web: bool, markdown: bool) -> ToggleConfig {
        ToggleConfig {
            deep_search: deep,
            web_search: web,
            markdown_output: markdown,
            ..ToggleConfig::default()
        }
    }

    #[test]
    fn identity_when_no_attachment_and_toggles_off() {
        let out = compose("What is 2+2?", None, ToggleConfig::default());
        assert_eq!(out.as_deref(), Some("What is 2+2?"));
    }

    #[test]
    fn empty_input_without_attachment_is_rejected() {
        assert_eq!(compose("", None, ToggleConfig::default()), None);
        assert_eq!(compose("   \n\t", None, ToggleConfig::default()), None);
    }

    #[test]
    fn attachment_alone_is_enough() {
        let file = Attachment {
            name: "notes.txt".into(),
            content: "line one".into(),
        };
        let out = compose("", Some(&file), ToggleConfig::default()).expect("composed");
        assert_eq!(out, "[Uploaded file content]:\nline one\n\n[My question]:\n");
    }

    #[test]
    fn attachment_template_wraps_question() {
        let file = Attachment {
            name: "data.csv".into(),
            content: "a,b".into(),
        };
        let out = compose("summarize", Some(&file), ToggleConfig::default()).expect("composed");
        assert_eq!(out, "[Uploaded file content]:\na,b\n\n[My question]:\nsummarize");
    }

    #[test]
    fn suffixes_appear_in_fixed_order_for_every_combination() {
        for bits in 0..8u8 {
            let cfg = toggles(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            let out = compose("q", None, cfg).expect("composed");
            assert_eq!(out.contains(DEEP_SEARCH_SUFFIX), cfg.deep_search);
            assert_eq!(out.contains(WEB_SEARCH_SUFFIX), cfg.web_search);
            assert_eq!(out.contains(MARKDOWN_SUFFIX), cfg.markdown_output);
            if cfg.deep_search && cfg.web_search {
                let deep = out.find(DEEP_SEARCH_SUFFIX).expect("deep present");
                let web = out.find(WEB_SEARCH_SUFFIX).expect("web present");
                assert!(deep < web);
            }
            if cfg.web_search && cfg.markdown_output {
                let web = out.find(WEB_SEARCH_SUFFIX).expect("web present");
                let md = out.find(MARKDOWN_SUFFIX).expect("markdown present");
                assert!(web < md);
            }
        }
    }

    #[test]
    fn composition_is_deterministic() {
        let cfg = toggles(true, true, true);
        assert_eq!(compose("same", None, cfg), compose("same", None, cfg));
    }
}
