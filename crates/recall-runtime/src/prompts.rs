//! Prompt construction: the init-vs-continuation split and the
//! `<observed_from_primary_session>` XML the runner sends for each tool
//! event.

use recall_types::pending::{ObservationEvent, SummarizeEvent};

/// The first turn on a session's generator conversation: establishes the
/// observer role, the project, the originating request, and the exact
/// output format. Never re-sent for the lifetime of the conversation.
pub fn init_prompt(project: &str, user_prompt: Option<&str>) -> String {
    let request = user_prompt.unwrap_or("(no initial request recorded)");
    format!(
        "You are the memory observer for an AI coding agent working on the \
         project \"{project}\". The user's originating request for this \
         session was:\n\n{request}\n\n\
         You will receive a stream of <observed_from_primary_session> \
         elements, each describing one tool invocation made by the primary \
         agent. For each one, decide whether it represents observation-worthy \
         work and, if so, respond with one or more <observation> elements, \
         each shaped like:\n\n\
         <observation>\n  <type>decision|bugfix|feature|refactor|discovery|change</type>\n  \
         <title>...</title>\n  <subtitle>...</subtitle>\n  <narrative>...</narrative>\n  \
         <facts><fact>...</fact></facts>\n  <concepts><concept>...</concept></concepts>\n  \
         <files_read><file>...</file></files_read>\n  \
         <files_modified><file>...</file></files_modified>\n</observation>\n\n\
         Every field except <type> may be omitted. When asked to summarize, \
         respond with a <summary> element (same optional-field shape: \
         <request>, <investigated>, <learned>, <completed>, <next_steps>, \
         <notes>) or a self-closing <skip_summary/> if there is truly \
         nothing to report; but prefer producing a minimal <summary> over \
         skipping."
    )
}

/// Subsequent turns re-establish format expectations without rebuilding the
/// whole role or re-declaring it, avoiding a full context rebuild per event.
pub const CONTINUATION_PROMPT: &str =
    "Continue observing. Respond with <observation> elements per the format \
     already established, or nothing if this event is not observation-worthy.";

/// Serializes one queued tool event as the `<observed_from_primary_session>`
/// block the generator expects.
pub fn observation_event_xml(event: &ObservationEvent) -> String {
    let cwd = event
        .cwd
        .as_deref()
        .map(|c| format!("\n  <cwd>{}</cwd>", escape(c)))
        .unwrap_or_default();
    format!(
        "<observed_from_primary_session>\n  <tool_name>{}</tool_name>\n  \
         <timestamp>{}</timestamp>{cwd}\n  <tool_input>{}</tool_input>\n  \
         <tool_response>{}</tool_response>\n</observed_from_primary_session>",
        escape(&event.tool_name),
        chrono::Utc::now().to_rfc3339(),
        escape(&event.tool_input.to_string()),
        escape(&event.tool_response.to_string()),
    )
}

/// Serializes a summarize request, including the last assistant message from
/// the host so the generator has enough context to produce a summary.
pub fn summarize_prompt_xml(event: &SummarizeEvent) -> String {
    let user = event.last_user_message.as_deref().unwrap_or("");
    let assistant = event.last_assistant_message.as_deref().unwrap_or("");
    format!(
        "<summarize_request>\n  <last_user_message>{}</last_user_message>\n  \
         <last_assistant_message>{}</last_assistant_message>\n</summarize_request>\n\n\
         Produce a <summary> (or <skip_summary/> only if genuinely nothing \
         happened this session) capturing progress so far.",
        escape(user),
        escape(assistant),
    )
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_prompt_carries_project_and_request() {
        let prompt = init_prompt("demo", Some("Build auth"));
        assert!(prompt.contains("demo"));
        assert!(prompt.contains("Build auth"));
    }

    #[test]
    fn observation_event_escapes_angle_brackets() {
        let event = ObservationEvent {
            tool_name: "Read".to_string(),
            tool_input: serde_json::json!({"file": "<a>"}),
            tool_response: serde_json::json!("ok"),
            cwd: Some("/tmp".to_string()),
            prompt_number: Some(1),
        };
        let xml = observation_event_xml(&event);
        assert!(xml.contains("&lt;a&gt;"));
        assert!(xml.contains("<cwd>/tmp</cwd>"));
    }
}
