//! Prompt construction for the story and summary calls. The storyteller
//! prompt carries the JSON-only output contract the sanitizer depends on.

/// Number of recent history entries sent verbatim to the story model.
pub const MAX_HISTORY_FOR_PROMPT: usize = 10;

/// How many turns the summarizer looks back over (doubled when slicing
/// recent developments, to overlap with the previous summary).
pub const SUMMARIZE_TURN_INTERVAL: usize = 7;

/// Default system prompt for a story turn.
pub fn story_system_prompt(tale_title: &str, summary: &str, context: &str) -> String {
    format!(
        "You are a classic storyteller guiding an interactive tale. Continue the story \
in the established tone and keep characters, setting and plot consistent with \
everything that has happened so far.

Current tale: \"{tale_title}\"
The story so far: {summary}
{context}

Read the recent interaction history and pay closest attention to the reader's last \
action. If it is a predefined choice (\"My choice: ...\"), continue the story along \
that path. If it is a custom action (\"My custom action: ...\"), first weave the \
described action naturally into the narrative, then continue from its outcome.

Write the next scene in two to four sentences: open on the situation or \
surroundings, introduce one central event or turn, and end openly so that a new \
decision becomes possible. The scene must follow logically from the story so far, \
stay inside the world of the tale, and must not repeat earlier content.

Immediately after the scene, offer exactly THREE distinct, plausible choices for \
how the story may continue. The first should stay close to the traditional course \
of the tale; the others may branch away, but have to remain believable within its \
world, and all three must clearly differ in action, tone or risk.

Format your entire response ONLY as a valid JSON object string, with no markdown \
and nothing outside the JSON object:
{{\"storySegment\": \"...\", \"choices\": [\"...\", \"...\", \"...\"]}}"
    )
}

/// Fills the placeholders of a caller-supplied story prompt template.
pub fn apply_prompt_template(template: &str, tale_title: &str, summary: &str, context: &str) -> String {
    template
        .replace("{tale_title}", tale_title)
        .replace("{current_summary}", summary)
        .replace("{tale_context}", context)
}

/// User prompt for a story turn: the recent history window, with an
/// elision marker when older entries were cut off.
pub fn story_user_prompt(history: &[String]) -> String {
    let start = history.len().saturating_sub(MAX_HISTORY_FOR_PROMPT);
    let marker = if start == 0 {
        "[Start of History]"
    } else {
        "[... earlier history summarized ...]"
    };
    format!(
        "Recent Interaction History:\n{marker}\n{}\n\n\
(The reader's most recent action is the last message in the history above)\n\n\
Your JSON Response:",
        history[start..].join("\n")
    )
}

/// Default system prompt for the summarizer call.
pub fn summary_system_prompt(tale_title: &str) -> String {
    format!(
        "You are an expert story summarizer. Condense the 'Existing Summary' and the \
'Recent Developments' into a single, updated, concise summary capturing the current \
plot state, characters and setting of this interactive story based on the tale \
'{tale_title}'. Focus on the information needed to continue the story logically. \
Output ONLY the updated summary text."
    )
}

/// Fills the placeholders of a caller-supplied summarizer prompt template.
pub fn apply_summary_template(template: &str, tale_title: &str, existing_summary: &str) -> String {
    template
        .replace("{tale_title}", tale_title)
        .replace("{existing_summary}", existing_summary)
}

/// User prompt for the summarizer call.
pub fn summary_user_prompt(existing_summary: &str, recent: &[String]) -> String {
    format!(
        "Existing Summary:\n{existing_summary}\n\nRecent Developments:\n{}\n\nUpdated Summary:",
        recent.join("\n")
    )
}
