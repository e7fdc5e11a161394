use serde_json::json;

use callassist_types::demo::{
    example_transcript_full, EXAMPLE_TRANSCRIPT_TURN_1, EXAMPLE_TRANSCRIPT_TURN_2, EXAMPLE_TRANSCRIPT_TURN_3,
};
use callassist_types::{ConversationTurn, SessionState};

const INDEX_TEMPLATE: &str = include_str!("../../web/index.html");

/// Models offered in the page's model picker
pub const MODEL_CHOICES: &[&str] = &[
    "databricks-claude-3-7-sonnet",
    "databricks-claude-sonnet-4",
    "databricks-meta-llama-3-3-70b-instruct",
    "databricks-llama-4-maverick",
];

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// JSON that is safe inside a `<script>` element
fn script_json(value: &serde_json::Value) -> String {
    value.to_string().replace("</", "<\\/")
}

fn model_options(selected: &str) -> String {
    let mut models: Vec<&str> = MODEL_CHOICES.to_vec();
    if !models.contains(&selected) {
        models.insert(0, selected);
    }

    models
        .into_iter()
        .map(|model| {
            let marker = if model == selected { " selected" } else { "" };
            format!(
                "<option value=\"{}\"{}>{}</option>",
                escape_html(model),
                marker,
                escape_html(model)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn history_html(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return "<div class=\"info-box\">Processed transcripts will appear here.</div>".to_string();
    }

    history
        .iter()
        .enumerate()
        .rev()
        .map(|(index, turn)| {
            let table = if turn.queried_table.is_empty() {
                String::new()
            } else {
                format!("<span class=\"queried-table\">{}</span>", escape_html(&turn.queried_table))
            };
            format!(
                "<div class=\"conversation\">\
<div class=\"conversation-header\">Turn {}{}</div>\
<div class=\"conversation-body\">\
<div class=\"conversation-transcript\">{}</div>\
<div class=\"conversation-response\">{}</div>\
</div></div>",
                index + 1,
                table,
                escape_html(&turn.transcript),
                turn.response
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the main page for `state`
pub fn render_index(state: &SessionState) -> String {
    let examples = json!({
        "turn1": EXAMPLE_TRANSCRIPT_TURN_1.trim(),
        "turn2": EXAMPLE_TRANSCRIPT_TURN_2.trim(),
        "turn3": EXAMPLE_TRANSCRIPT_TURN_3.trim(),
        "full": example_transcript_full().trim(),
    });
    let demo_state = serde_json::to_value(&state.demo_state).unwrap_or_else(|_| json!({}));

    INDEX_TEMPLATE
        .replace("{{TRANSCRIPT_INPUT}}", &escape_html(&state.transcript_input))
        .replace("{{EXPERIMENT_ID}}", &escape_html(&state.mlflow_experiment_id))
        .replace("{{MODEL_OPTIONS}}", &model_options(&state.llm_model))
        .replace("{{PROCESSING_CLASS}}", if state.processing { "" } else { "hidden" })
        .replace("{{HISTORY}}", &history_html(&state.conversation_history))
        .replace("{{EXAMPLES_JSON}}", &script_json(&examples))
        .replace("{{DEMO_STATE_JSON}}", &script_json(&demo_state))
        // Last, so placeholders inside a rendered report are never expanded
        .replace("{{AI_RESPONSE}}", &state.ai_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#), "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_default_page() {
        let html = render_index(&SessionState::default());
        assert!(html.contains("Put a transcript you would like to analyze here"));
        assert!(html.contains("<option value=\"databricks-claude-3-7-sonnet\" selected>"));
        assert!(html.contains("\"current_turn\":1"));
        assert!(html.contains("QuickShip Logistics"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn test_history_is_newest_first_and_escaped() {
        let mut state = SessionState::default();
        state.push_turn(ConversationTurn::new("first <call>", "<p>one</p>", "demo.transcripts"));
        state.push_turn(ConversationTurn::new("second", "<p>two</p>", ""));

        let html = render_index(&state);
        let second = html.find("conversation-header\">Turn 2").unwrap();
        let first = html.find("conversation-header\">Turn 1").unwrap();
        assert!(second < first);
        assert!(html.contains("first &lt;call&gt;"));
        assert!(html.contains("<span class=\"queried-table\">demo.transcripts</span>"));
    }

    #[test]
    fn test_unknown_model_is_still_selectable() {
        let options = model_options("my-endpoint");
        assert!(options.starts_with("<option value=\"my-endpoint\" selected>"));
    }

    #[test]
    fn test_script_json_breaks_closing_tags() {
        assert_eq!(script_json(&json!("</script>")), "\"<\\/script>\"");
    }
}
